use async_trait::async_trait;
use std::collections::HashMap;

use super::CatalogProvider;
use crate::error::FetchError;
use crate::models::{
    CatalogId, DeviceCategory, DeviceModel, DeviceType, LocalizedText, ServiceType,
};

/// Справочник в памяти
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    device_types: Vec<DeviceType>,
    device_models: Vec<DeviceModel>,
    service_types: Vec<ServiceType>,
    prices: HashMap<(CatalogId, CatalogId), f64>,
}

impl InMemoryCatalog {
    pub fn new(
        device_types: Vec<DeviceType>,
        device_models: Vec<DeviceModel>,
        service_types: Vec<ServiceType>,
    ) -> Self {
        Self {
            device_types,
            device_models,
            service_types,
            prices: HashMap::new(),
        }
    }

    pub fn with_price(
        mut self,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
        price_sar: f64,
    ) -> Self {
        self.prices.insert((device_model_id, service_type_id), price_sar);
        self
    }

    /// Встроенный справочник сервиса
    pub fn seeded() -> Self {
        let device_types = vec![
            device_type(1, DeviceCategory::Phone, "Apple", "iPhone", "آيفون"),
            device_type(2, DeviceCategory::Phone, "Samsung", "Samsung Galaxy", "سامسونج جالاكسي"),
            device_type(3, DeviceCategory::Phone, "Huawei", "Huawei", "هواوي"),
            device_type(4, DeviceCategory::Tablet, "Apple", "iPad", "آيباد"),
            device_type(5, DeviceCategory::Tablet, "Samsung", "Galaxy Tab", "جالاكسي تاب"),
            device_type(6, DeviceCategory::Laptop, "Apple", "MacBook", "ماك بوك"),
            device_type(7, DeviceCategory::Laptop, "Dell", "Dell", "ديل"),
            device_type(8, DeviceCategory::Other, "Apple", "Apple Watch", "ساعة أبل"),
        ];

        let device_models = vec![
            device_model(101, 1, "iPhone 15 Pro", "آيفون 15 برو", Some(2023)),
            device_model(102, 1, "iPhone 14", "آيفون 14", Some(2022)),
            device_model(103, 1, "iPhone 13", "آيفون 13", Some(2021)),
            device_model(201, 2, "Galaxy S24", "جالاكسي S24", Some(2024)),
            device_model(202, 2, "Galaxy A54", "جالاكسي A54", Some(2023)),
            device_model(301, 3, "P60 Pro", "P60 برو", Some(2023)),
            device_model(401, 4, "iPad Pro 12.9", "آيباد برو 12.9", Some(2022)),
            device_model(402, 4, "iPad Air", "آيباد إير", Some(2022)),
            device_model(501, 5, "Galaxy Tab S9", "جالاكسي تاب S9", Some(2023)),
            device_model(601, 6, "MacBook Pro 14", "ماك بوك برو 14", Some(2023)),
            device_model(602, 6, "MacBook Air M2", "ماك بوك إير M2", Some(2022)),
            device_model(701, 7, "XPS 13", "XPS 13", Some(2023)),
            device_model(801, 8, "Apple Watch Series 9", "ساعة أبل الإصدار 9", Some(2023)),
        ];

        let service_types = vec![
            service_type(1, "Screen replacement", "استبدال الشاشة", 60, 250.0),
            service_type(2, "Battery replacement", "استبدال البطارية", 45, 150.0),
            service_type(3, "Charging port repair", "إصلاح منفذ الشحن", 60, 120.0),
            service_type(4, "Water damage repair", "إصلاح أضرار المياه", 120, 300.0),
            service_type(5, "Camera repair", "إصلاح الكاميرا", 60, 200.0),
            service_type(6, "Software repair", "إصلاح البرمجيات", 30, 100.0),
        ];

        Self::new(device_types, device_models, service_types)
            .with_price(101, 1, 1100.0)
            .with_price(101, 2, 450.0)
            .with_price(102, 1, 850.0)
            .with_price(201, 1, 900.0)
            .with_price(601, 1, 2400.0)
    }
}

fn device_type(
    id: CatalogId,
    category: DeviceCategory,
    brand: &str,
    en: &str,
    ar: &str,
) -> DeviceType {
    DeviceType {
        id,
        category,
        brand: brand.to_string(),
        name: LocalizedText::new(en, ar),
    }
}

fn device_model(
    id: CatalogId,
    device_type_id: CatalogId,
    en: &str,
    ar: &str,
    release_year: Option<i32>,
) -> DeviceModel {
    DeviceModel {
        id,
        device_type_id,
        name: LocalizedText::new(en, ar),
        release_year,
    }
}

fn service_type(
    id: CatalogId,
    en: &str,
    ar: &str,
    estimated_duration_minutes: u32,
    base_price: f64,
) -> ServiceType {
    ServiceType {
        id,
        name: LocalizedText::new(en, ar),
        description: None,
        estimated_duration_minutes,
        base_price,
    }
}

#[async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
        Ok(self.device_types.clone())
    }

    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError> {
        if !self.device_types.iter().any(|t| t.id == device_type_id) {
            return Err(FetchError::UnknownDeviceType(device_type_id));
        }
        Ok(self
            .device_models
            .iter()
            .filter(|m| m.device_type_id == device_type_id)
            .cloned()
            .collect())
    }

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
        Ok(self.service_types.clone())
    }

    async fn get_service_price(
        &self,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
    ) -> Result<Option<f64>, FetchError> {
        Ok(self.prices.get(&(device_model_id, service_type_id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_seeded_model_references_an_existing_type() {
        let catalog = InMemoryCatalog::seeded();
        let types = catalog.get_device_types().await.unwrap();
        for model in &catalog.device_models {
            assert!(
                types.iter().any(|t| t.id == model.device_type_id),
                "model {} points to missing type {}",
                model.id,
                model.device_type_id
            );
        }
    }

    #[tokio::test]
    async fn models_are_filtered_by_device_type() {
        let catalog = InMemoryCatalog::seeded();
        let models = catalog.get_device_models(1).await.unwrap();
        assert_eq!(models.len(), 3);
        assert!(models.iter().all(|m| m.device_type_id == 1));
    }

    #[tokio::test]
    async fn unknown_device_type_is_an_error() {
        let catalog = InMemoryCatalog::seeded();
        assert_eq!(
            catalog.get_device_models(999).await,
            Err(FetchError::UnknownDeviceType(999))
        );
    }

    #[tokio::test]
    async fn price_table_lookup_is_exact_pair() {
        let catalog = InMemoryCatalog::seeded();
        assert_eq!(catalog.get_service_price(101, 1).await, Ok(Some(1100.0)));
        assert_eq!(catalog.get_service_price(101, 3).await, Ok(None));
    }
}
