use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::Location;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("store returned HTTP {0}")]
    Status(StatusCode),

    #[error("no stored location matches {0:?}")]
    NotFound(String),

    #[error("store returned a document without an identifier")]
    MissingId,
}

/// CRUD access to the location collection.
///
/// Identifiers are opaque strings assigned by the store on `create`. Name and
/// coordinate lookups return the first matching document in store order.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Location>, StoreError>;

    /// Persist a new location and return it with the assigned identifier
    async fn create(&self, location: &Location) -> Result<Location, StoreError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Location>, StoreError>;

    async fn find_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError>;

    /// Replace the document stored under `id`
    async fn update(&self, id: &str, location: &Location) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Identifier of the first location called `name`
    async fn resolve_id(&self, name: &str) -> Result<String, StoreError> {
        self.find_by_name(name)
            .await?
            .and_then(|location| location.id)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Delete the first location called `name` and return its identifier
    async fn delete_by_name(&self, name: &str) -> Result<String, StoreError> {
        let id = self.resolve_id(name).await?;
        self.delete(&id).await?;
        Ok(id)
    }
}
