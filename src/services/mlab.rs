use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::ACCEPT, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::store::{LocationStore, StoreError};
use crate::models::{wire, Location};

pub const DEFAULT_STORE_BASE_URL: &str = "https://api.mlab.com";

/// Location as it is kept in the remote collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDocument {
    #[serde(rename = "_id", default, skip_serializing)]
    pub id: Option<DocumentId>,
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "wire::coordinate",
        serialize_with = "wire::coordinate_as_string"
    )]
    pub latitude: f64,
    #[serde(
        default,
        deserialize_with = "wire::coordinate",
        serialize_with = "wire::coordinate_as_string"
    )]
    pub longitude: f64,
    #[serde(default)]
    pub info: String,
    #[serde(default, deserialize_with = "wire::epoch_seconds")]
    pub timestamp: Option<i64>,
}

/// `{"$oid": "..."}` as written by the Data API, or a bare string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Object {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Plain(String),
}

impl DocumentId {
    pub fn into_string(self) -> String {
        match self {
            Self::Object { oid } => oid,
            Self::Plain(id) => id,
        }
    }
}

impl From<&Location> for LocationDocument {
    fn from(location: &Location) -> Self {
        Self {
            id: None,
            name: location.name.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            info: location.info.clone(),
            timestamp: Some(location.timestamp.timestamp()),
        }
    }
}

impl From<LocationDocument> for Location {
    fn from(document: LocationDocument) -> Self {
        let timestamp = document
            .timestamp
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .unwrap_or_else(|| {
                tracing::debug!("Document {:?} has no usable timestamp", document.name);
                Utc::now()
            });

        Self {
            id: document.id.map(DocumentId::into_string),
            name: document.name,
            latitude: document.latitude,
            longitude: document.longitude,
            info: document.info,
            timestamp,
        }
    }
}

/// Location collection behind an mLab-style REST Data API
pub struct MlabStore {
    client: Client,
    collection_url: String,
    api_key: String,
}

impl MlabStore {
    pub fn new(
        base_url: &str,
        collection_path: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;

        let collection_url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            collection_path.trim_matches('/')
        );

        Ok(Self {
            client,
            collection_url,
            api_key: api_key.into(),
        })
    }

    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url, id)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(ACCEPT, "application/json")
            .query(&[("apiKey", self.api_key.as_str())])
    }

    fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            tracing::warn!("Store returned HTTP {}", status);
            Err(StoreError::Status(status))
        }
    }

    async fn first_matching(
        &self,
        filter: serde_json::Value,
    ) -> Result<Option<Location>, StoreError> {
        let request = self
            .client
            .get(&self.collection_url)
            .query(&[("q", filter.to_string())]);

        let response = Self::check(self.authorized(request).send().await?)?;
        let documents: Vec<serde_json::Value> = response.json().await?;

        Ok(decode_documents(documents).next())
    }
}

/// Decode each document on its own; one unreadable entry must not hide the rest
fn decode_documents(documents: Vec<serde_json::Value>) -> impl Iterator<Item = Location> {
    documents.into_iter().filter_map(|document| {
        let name = document.get("name").cloned().unwrap_or_default();
        match serde_json::from_value::<LocationDocument>(document) {
            Ok(decoded) => Some(Location::from(decoded)),
            Err(e) => {
                tracing::warn!("Skipping unreadable document named {}: {}", name, e);
                None
            }
        }
    })
}

#[async_trait]
impl LocationStore for MlabStore {
    #[tracing::instrument(name = "MlabStore::list", skip(self))]
    async fn list(&self) -> Result<Vec<Location>, StoreError> {
        let request = self.client.get(&self.collection_url);
        let response = Self::check(self.authorized(request).send().await?)?;
        let documents: Vec<serde_json::Value> = response.json().await?;

        Ok(decode_documents(documents).collect())
    }

    #[tracing::instrument(name = "MlabStore::create", skip(self, location), fields(name = %location.name))]
    async fn create(&self, location: &Location) -> Result<Location, StoreError> {
        let request = self
            .client
            .post(&self.collection_url)
            .json(&LocationDocument::from(location));

        let response = Self::check(self.authorized(request).send().await?)?;
        let stored: LocationDocument = response.json().await?;
        let id = stored.id.ok_or(StoreError::MissingId)?.into_string();

        Ok(Location {
            id: Some(id),
            ..location.clone()
        })
    }

    #[tracing::instrument(name = "MlabStore::find_by_name", skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Location>, StoreError> {
        self.first_matching(json!({ "name": name })).await
    }

    #[tracing::instrument(name = "MlabStore::find_by_coordinates", skip(self))]
    async fn find_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        self.first_matching(json!({
            "latitude": wire::format_coordinate(latitude),
            "longitude": wire::format_coordinate(longitude),
        }))
        .await
    }

    #[tracing::instrument(name = "MlabStore::update", skip(self, location))]
    async fn update(&self, id: &str, location: &Location) -> Result<(), StoreError> {
        let request = self
            .client
            .put(self.document_url(id))
            .json(&LocationDocument::from(location));

        Self::check(self.authorized(request).send().await?)?;
        Ok(())
    }

    #[tracing::instrument(name = "MlabStore::delete", skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.document_url(id));

        Self::check(self.authorized(request).send().await?)?;
        Ok(())
    }
}
