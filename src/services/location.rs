use std::sync::Arc;
use tracing::info;

use super::geocode::Geocoder;
use super::store::{LocationStore, StoreError};
use crate::libraries::enrichment::EnrichmentPolicy;
use crate::libraries::retention::{RetentionPolicy, RetentionSweeper, SweepSchedule};
use crate::models::{Location, LocationPayload};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("no location named {0:?}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => Self::NotFound(name),
            other => Self::Store(other),
        }
    }
}

/// Location lifecycle: enrichment on add/update, lookups, and the
/// background retention sweep.
pub struct LocationService {
    store: Arc<dyn LocationStore>,
    enrichment: EnrichmentPolicy,
    sweeper: RetentionSweeper,
    schedule: SweepSchedule,
}

impl LocationService {
    pub fn new(
        store: Arc<dyn LocationStore>,
        geocoder: Arc<dyn Geocoder>,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            sweeper: RetentionSweeper::new(store.clone(), retention),
            enrichment: EnrichmentPolicy::new(geocoder),
            schedule: SweepSchedule::new(),
            store,
        }
    }

    /// Begin periodic retention sweeps, replacing any running schedule
    pub fn start(&self) {
        self.schedule.start(self.sweeper.clone());
    }

    pub fn stop(&self) {
        self.schedule.stop();
    }

    pub fn is_sweeping(&self) -> bool {
        self.schedule.is_active()
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    /// Enrich and persist a new location
    #[tracing::instrument(skip(self))]
    pub async fn add(&self, payload: LocationPayload) -> Result<Location, ServiceError> {
        let mut location = Location::new(payload.name, payload.latitude, payload.longitude);
        location.info = self
            .enrichment
            .info_for(location.latitude, location.longitude)
            .await;

        let stored = self.store.create(&location).await?;
        info!(
            "Added location {:?} at ({}, {}) {:?}",
            stored.name, stored.latitude, stored.longitude, stored.info
        );

        Ok(stored)
    }

    /// Rewrite the stored location with the same name. The info text is
    /// derived again from the new coordinates; creation time and identifier
    /// are kept from the stored record.
    #[tracing::instrument(skip(self))]
    pub async fn update(&self, payload: LocationPayload) -> Result<Location, ServiceError> {
        let existing = self
            .store
            .find_by_name(&payload.name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(payload.name.clone()))?;
        let id = existing
            .id
            .clone()
            .ok_or_else(|| ServiceError::NotFound(payload.name.clone()))?;

        let info = self
            .enrichment
            .info_for(payload.latitude, payload.longitude)
            .await;

        let location = Location {
            id: Some(id.clone()),
            name: payload.name,
            latitude: payload.latitude,
            longitude: payload.longitude,
            info,
            timestamp: existing.timestamp,
        };

        self.store.update(&id, &location).await?;
        info!("Updated location {:?} ({})", location.name, id);

        Ok(location)
    }

    pub async fn get(&self, name: &str) -> Result<Option<Location>, ServiceError> {
        Ok(self.store.find_by_name(name).await?)
    }

    pub async fn find_at(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<Location>, ServiceError> {
        Ok(self.store.find_by_coordinates(latitude, longitude).await?)
    }

    pub async fn list(&self) -> Result<Vec<Location>, ServiceError> {
        Ok(self.store.list().await?)
    }

    /// Delete the first location called `name`
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> Result<(), ServiceError> {
        let id = self.store.delete_by_name(name).await?;
        info!("Removed location {:?} ({})", name, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocode::{GeocodeError, GeocodeResponse, GeocodeResult};
    use crate::services::memory_store::MemoryStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every lookup with the same formatted address
    struct FixedGeocoder {
        address: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse_geocode(&self, _: f64, _: f64) -> Result<GeocodeResponse, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeocodeResponse {
                status: "OK".to_string(),
                results: vec![GeocodeResult {
                    formatted_address: self.address.to_string(),
                }],
            })
        }
    }

    fn service(address: &'static str) -> (LocationService, Arc<MemoryStore>, Arc<FixedGeocoder>) {
        let store = Arc::new(MemoryStore::new());
        let geocoder = Arc::new(FixedGeocoder {
            address,
            calls: AtomicUsize::new(0),
        });
        let service =
            LocationService::new(store.clone(), geocoder.clone(), RetentionPolicy::default());
        (service, store, geocoder)
    }

    #[tokio::test]
    async fn test_add_enriches_and_persists() {
        let (service, store, _) = service("Domkloster 4, 50667 Köln, Germany");

        let added = service
            .add(LocationPayload::new("dom", 50.9413, 6.9583))
            .await
            .unwrap();

        assert!(added.is_persisted());
        assert_eq!(added.info, "Koeln, Germany");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_add_zero_coordinate_leaves_info_empty() {
        let (service, _, geocoder) = service("a, b, c");

        let added = service
            .add(LocationPayload::new("unset", 0.0, 0.0))
            .await
            .unwrap();

        assert_eq!(added.info, "");
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_then_get_round_trip() {
        let (service, _, _) = service("1 Rue, 75001 Paris, France");

        service
            .add(LocationPayload::new("louvre", 48.8606, 2.3376))
            .await
            .unwrap();
        let fetched = service.get("louvre").await.unwrap().unwrap();

        assert_eq!(fetched.name, "louvre");
        assert_eq!(fetched.latitude, 48.8606);
        assert_eq!(fetched.longitude, 2.3376);
        assert_eq!(fetched.info, "Paris, France");
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_timestamp() {
        let (service, store, _) = service("Hbf, 80335 München, Germany");
        let mut original = Location::new("car", 0.0, 0.0);
        original.timestamp = Utc::now() - Duration::hours(5);
        let original = store.create(&original).await.unwrap();

        let updated = service
            .update(LocationPayload::new("car", 48.14, 11.56))
            .await
            .unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.timestamp, original.timestamp);
        assert_eq!(updated.info, "Muenchen, Germany");

        let stored = service.get("car").await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_update_unknown_name_is_not_found() {
        let (service, store, geocoder) = service("a, b, c");

        let result = service
            .update(LocationPayload::new("ghost", 1.0, 1.0))
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound(name)) if name == "ghost"));
        assert!(store.is_empty().await);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_find_at_and_list() {
        let (service, _, _) = service("a, b, c");
        service.add(LocationPayload::new("one", 1.0, 2.0)).await.unwrap();
        service.add(LocationPayload::new("two", 3.0, 4.0)).await.unwrap();

        let found = service.find_at(3.0, 4.0).await.unwrap().unwrap();
        assert_eq!(found.name, "two");
        assert!(service.find_at(5.0, 6.0).await.unwrap().is_none());

        let names: Vec<_> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_remove_by_name() {
        let (service, store, _) = service("a, b, c");
        service.add(LocationPayload::new("gone", 1.0, 2.0)).await.unwrap();

        service.remove("gone").await.unwrap();
        assert!(store.is_empty().await);

        assert!(matches!(
            service.remove("gone").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let (service, _, _) = service("a, b, c");
        assert!(!service.is_sweeping());

        service.start();
        service.start();
        assert!(service.is_sweeping());

        service.stop();
        assert!(!service.is_sweeping());
    }
}
