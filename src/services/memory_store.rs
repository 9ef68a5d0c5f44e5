use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{LocationStore, StoreError};
use crate::models::Location;

/// Process-local location collection, kept in insertion order.
/// Used for development and tests; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    locations: RwLock<Vec<Location>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.locations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locations.read().await.is_empty()
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Location>, StoreError> {
        Ok(self.locations.read().await.clone())
    }

    async fn create(&self, location: &Location) -> Result<Location, StoreError> {
        let stored = Location {
            id: Some(Uuid::new_v4().simple().to_string()),
            ..location.clone()
        };

        self.locations.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Location>, StoreError> {
        let locations = self.locations.read().await;
        Ok(locations.iter().find(|l| l.name == name).cloned())
    }

    async fn find_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, StoreError> {
        let locations = self.locations.read().await;
        Ok(locations
            .iter()
            .find(|l| l.latitude == latitude && l.longitude == longitude)
            .cloned())
    }

    async fn update(&self, id: &str, location: &Location) -> Result<(), StoreError> {
        let mut locations = self.locations.write().await;
        let slot = locations
            .iter_mut()
            .find(|l| l.id.as_deref() == Some(id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        *slot = Location {
            id: Some(id.to_string()),
            ..location.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut locations = self.locations.write().await;
        let before = locations.len();
        locations.retain(|l| l.id.as_deref() != Some(id));

        if locations.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let first = store.create(&Location::new("a", 1.0, 1.0)).await.unwrap();
        let second = store.create(&Location::new("a", 2.0, 2.0)).await.unwrap();

        assert!(first.is_persisted());
        assert_ne!(first.id, second.id);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_lookups_return_first_match() {
        let store = MemoryStore::new();
        let first = store.create(&Location::new("twin", 1.0, 2.0)).await.unwrap();
        store.create(&Location::new("twin", 3.0, 4.0)).await.unwrap();

        let by_name = store.find_by_name("twin").await.unwrap().unwrap();
        assert_eq!(by_name.id, first.id);

        let by_coordinates = store.find_by_coordinates(3.0, 4.0).await.unwrap().unwrap();
        assert_eq!(by_coordinates.latitude, 3.0);

        assert!(store.find_by_name("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_by_id() {
        let store = MemoryStore::new();
        let stored = store.create(&Location::new("a", 1.0, 1.0)).await.unwrap();
        let id = stored.id.clone().unwrap();

        let mut changed = stored.clone();
        changed.latitude = 9.0;
        store.update(&id, &changed).await.unwrap();
        assert_eq!(store.find_by_name("a").await.unwrap().unwrap().latitude, 9.0);

        store.delete(&id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            store.delete(&id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_id() {
        let store = MemoryStore::new();
        let stored = store.create(&Location::new("a", 1.0, 1.0)).await.unwrap();

        assert_eq!(store.resolve_id("a").await.unwrap(), stored.id.unwrap());
        assert!(matches!(
            store.resolve_id("b").await,
            Err(StoreError::NotFound(name)) if name == "b"
        ));
    }

    #[tokio::test]
    async fn test_delete_by_name_removes_first_match() {
        let store = MemoryStore::new();
        let first = store.create(&Location::new("twin", 1.0, 1.0)).await.unwrap();
        store.create(&Location::new("twin", 2.0, 2.0)).await.unwrap();

        assert_eq!(store.delete_by_name("twin").await.unwrap(), first.id.unwrap());
        let left = store.find_by_name("twin").await.unwrap().unwrap();
        assert_eq!(left.latitude, 2.0);

        store.delete_by_name("twin").await.unwrap();
        assert!(matches!(
            store.delete_by_name("twin").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
