use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Reverse geocoding response (Google Geocoding JSON shape)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub formatted_address: String,
}

impl GeocodeResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geocode service returned HTTP {0}")]
    Status(StatusCode),
}

impl GeocodeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }
}

/// Turns a coordinate pair into address candidates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<GeocodeResponse, GeocodeError>;
}

/// Google-style reverse geocoding over HTTP
pub struct GoogleGeocoder {
    client: Client,
    url: String,
    api_key: Option<String>,
}

impl GoogleGeocoder {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(concat!("location-service/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.filter(|key| !key.is_empty()),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[tracing::instrument(name = "GoogleGeocoder::reverse_geocode", skip(self))]
    async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<GeocodeResponse, GeocodeError> {
        let mut request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .query(&[
                ("latlng", format!("{},{}", latitude, longitude)),
                ("sensor", "false".to_string()),
            ]);

        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request.send().await?;

        if response.status() != StatusCode::OK {
            tracing::warn!("Geocode service returned HTTP {}", response.status());
            return Err(GeocodeError::Status(response.status()));
        }

        let data: GeocodeResponse = response.json().await?;
        tracing::debug!(
            "Geocode status {} with {} result(s)",
            data.status,
            data.results.len()
        );

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_defaults_for_missing_fields() {
        let response: GeocodeResponse = serde_json::from_str("{}").unwrap();
        assert!(!response.is_ok());
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_response_parses_google_shape() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [
                    {"formatted_address": "Domkloster 4, 50667 Köln, Germany", "place_id": "x"}
                ]
            }"#,
        )
        .unwrap();

        assert!(response.is_ok());
        assert_eq!(
            response.results[0].formatted_address,
            "Domkloster 4, 50667 Köln, Germany"
        );
    }

    #[test]
    fn test_empty_api_key_is_dropped() {
        let geocoder =
            GoogleGeocoder::new(DEFAULT_GEOCODE_URL, Some(String::new()), Duration::from_secs(1))
                .unwrap();
        assert!(geocoder.api_key.is_none());
    }
}
