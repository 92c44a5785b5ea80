//! Справочник устройств и услуг.
//!
//! Мастер только читает справочник через трейт [`CatalogProvider`]. Реализации:
//! - [`InMemoryCatalog`]: встроенный справочник (по умолчанию и в тестах);
//! - [`HttpCatalogClient`]: внешний сервис справочника по HTTP;
//! - [`CachedCatalog`]: кеш поверх любого источника. Ошибки не кешируются.

pub mod cached;
pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::{CatalogId, DeviceModel, DeviceType, ServiceType};

pub use cached::CachedCatalog;
pub use http::HttpCatalogClient;
pub use memory::InMemoryCatalog;

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError>;

    /// Модели только одного типа устройства
    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError>;

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError>;

    /// Цена из таблицы цен для пары (модель, услуга), в SAR.
    /// Источник без таблицы цен возвращает `None`.
    async fn get_service_price(
        &self,
        _device_model_id: CatalogId,
        _service_type_id: CatalogId,
    ) -> Result<Option<f64>, FetchError> {
        Ok(None)
    }
}
