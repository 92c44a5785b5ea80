use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use super::CatalogProvider;
use crate::config::CatalogConfig;
use crate::error::FetchError;
use crate::models::{CatalogId, DeviceModel, DeviceType, ServiceType};

/// Строка таблицы цен во внешнем справочнике
#[derive(Debug, Deserialize)]
struct PriceEntry {
    price_sar: f64,
}

/// Клиент внешнего справочника по HTTP
#[derive(Clone)]
pub struct HttpCatalogClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// `None`, если url справочника не задан
    pub fn from_config(config: &CatalogConfig) -> Result<Option<Self>, FetchError> {
        config
            .url
            .as_deref()
            .map(|url| Self::new(url, Duration::from_secs(config.timeout_seconds)))
            .transpose()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.http_client.get(&url).send().await.map_err(|e| {
            error!("Catalog request {} failed: {:?}", url, e);
            FetchError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Catalog request {} returned {}", url, status);
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<T>().await.map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl CatalogProvider for HttpCatalogClient {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
        self.get_json("/device-types").await
    }

    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError> {
        let models: Vec<DeviceModel> = self
            .get_json(&format!("/device-types/{}/models", device_type_id))
            .await?;
        // Справочник не должен отдавать чужие модели, но проверяем
        Ok(models
            .into_iter()
            .filter(|m| m.device_type_id == device_type_id)
            .collect())
    }

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
        self.get_json("/service-types").await
    }

    async fn get_service_price(
        &self,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
    ) -> Result<Option<f64>, FetchError> {
        let path = format!(
            "/prices?model_id={}&service_type_id={}",
            device_model_id, service_type_id
        );
        match self.get_json::<Option<PriceEntry>>(&path).await {
            Ok(entry) => Ok(entry.map(|e| e.price_sar)),
            Err(FetchError::Status(code)) if code == StatusCode::NOT_FOUND.as_u16() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
