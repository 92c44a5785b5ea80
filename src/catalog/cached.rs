use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::CatalogProvider;
use crate::error::FetchError;
use crate::models::{CatalogId, DeviceModel, DeviceType, ServiceType};

#[derive(Clone)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// Кеш справочника поверх любого источника.
///
/// Кешируются только успешные ответы: после ошибки следующий запрос
/// снова идет в источник. Таблица цен не кешируется.
#[derive(Clone)]
pub struct CachedCatalog {
    inner: Arc<dyn CatalogProvider>,
    ttl: Duration,
    device_types: Arc<RwLock<Option<Entry<Vec<DeviceType>>>>>,
    device_models: Arc<RwLock<HashMap<CatalogId, Entry<Vec<DeviceModel>>>>>,
    service_types: Arc<RwLock<Option<Entry<Vec<ServiceType>>>>>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            device_types: Arc::new(RwLock::new(None)),
            device_models: Arc::new(RwLock::new(HashMap::new())),
            service_types: Arc::new(RwLock::new(None)),
        }
    }

    // Прогрев кеша при старте
    pub async fn warmup(&self) {
        info!("Starting catalog cache warmup...");

        if let Ok(types) = self.get_device_types().await {
            info!("Loaded {} device types", types.len());
        }
        if let Ok(services) = self.get_service_types().await {
            info!("Loaded {} service types", services.len());
        }

        info!("Catalog cache warmup done");
    }

    fn fresh<T: Clone>(&self, entry: Option<&Entry<T>>) -> Option<T> {
        entry
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }
}

#[async_trait]
impl CatalogProvider for CachedCatalog {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
        // Сначала пробуем кеш
        if let Some(types) = self.fresh(self.device_types.read().await.as_ref()) {
            return Ok(types);
        }

        // Промах - идем в источник
        let types = self.inner.get_device_types().await?;
        *self.device_types.write().await = Some(Entry {
            value: types.clone(),
            stored_at: Instant::now(),
        });
        Ok(types)
    }

    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError> {
        if let Some(models) = self.fresh(self.device_models.read().await.get(&device_type_id)) {
            debug!("Catalog cache hit for models of device type {}", device_type_id);
            return Ok(models);
        }

        let models = self.inner.get_device_models(device_type_id).await?;
        self.device_models.write().await.insert(
            device_type_id,
            Entry {
                value: models.clone(),
                stored_at: Instant::now(),
            },
        );
        Ok(models)
    }

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
        if let Some(services) = self.fresh(self.service_types.read().await.as_ref()) {
            return Ok(services);
        }

        let services = self.inner.get_service_types().await?;
        *self.service_types.write().await = Some(Entry {
            value: services.clone(),
            stored_at: Instant::now(),
        });
        Ok(services)
    }

    async fn get_service_price(
        &self,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
    ) -> Result<Option<f64>, FetchError> {
        self.inner.get_service_price(device_model_id, service_type_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Источник, который считает обращения и падает первые `failures` раз
    struct Flaky {
        inner: InMemoryCatalog,
        calls: AtomicU32,
        failures: u32,
    }

    #[async_trait]
    impl CatalogProvider for Flaky {
        async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
            self.inner.get_device_types().await
        }

        async fn get_device_models(
            &self,
            device_type_id: CatalogId,
        ) -> Result<Vec<DeviceModel>, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(FetchError::Transport("connection reset".to_string()));
            }
            self.inner.get_device_models(device_type_id).await
        }

        async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
            self.inner.get_service_types().await
        }
    }

    #[tokio::test]
    async fn successful_models_are_served_from_cache() {
        let source = Arc::new(Flaky {
            inner: InMemoryCatalog::seeded(),
            calls: AtomicU32::new(0),
            failures: 0,
        });
        let cached = CachedCatalog::new(source.clone(), Duration::from_secs(60));

        cached.get_device_models(1).await.unwrap();
        cached.get_device_models(1).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let source = Arc::new(Flaky {
            inner: InMemoryCatalog::seeded(),
            calls: AtomicU32::new(0),
            failures: 1,
        });
        let cached = CachedCatalog::new(source.clone(), Duration::from_secs(60));

        assert!(cached.get_device_models(1).await.is_err());
        assert_eq!(cached.get_device_models(1).await.unwrap().len(), 3);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let source = Arc::new(Flaky {
            inner: InMemoryCatalog::seeded(),
            calls: AtomicU32::new(0),
            failures: 0,
        });
        let cached = CachedCatalog::new(source.clone(), Duration::ZERO);

        cached.get_device_models(2).await.unwrap();
        cached.get_device_models(2).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }
}
