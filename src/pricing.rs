//! Расчет стоимости ремонта.
//!
//! Порядок: сначала цена из таблицы для пары (модель, услуга), если ее нет
//! или справочник недоступен - оценка по формуле
//! `base_price * brand_multiplier * category_multiplier`, округленная до целых SAR.

use tracing::{debug, warn};

use crate::catalog::CatalogProvider;
use crate::config::PricingConfig;
use crate::models::{CatalogId, DeviceCategory, PriceQuote, PriceSource};

pub const PREMIUM_BRAND_MULTIPLIER: f64 = 1.2;
pub const STANDARD_BRAND_MULTIPLIER: f64 = 1.0;

pub fn category_multiplier(category: DeviceCategory) -> f64 {
    match category {
        DeviceCategory::Laptop => 1.5,
        DeviceCategory::Tablet => 1.3,
        DeviceCategory::Phone | DeviceCategory::Other => 1.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn is_premium(&self, brand: &str) -> bool {
        let brand = brand.trim();
        self.config
            .premium_brands
            .iter()
            .any(|p| p.eq_ignore_ascii_case(brand))
    }

    pub fn brand_multiplier(&self, brand: &str) -> f64 {
        if self.is_premium(brand) {
            PREMIUM_BRAND_MULTIPLIER
        } else {
            STANDARD_BRAND_MULTIPLIER
        }
    }

    /// Оценка по формуле, без обращения к справочнику
    pub fn estimate(&self, category: DeviceCategory, brand: &str, base_price: f64) -> PriceQuote {
        let brand_multiplier = self.brand_multiplier(brand);
        let category_multiplier = category_multiplier(category);
        let raw = base_price * brand_multiplier * category_multiplier;

        PriceQuote {
            base_price,
            brand_multiplier,
            category_multiplier,
            final_price: raw.round() as i64,
            source: PriceSource::Formula,
        }
    }

    /// Цена из таблицы, как есть
    pub fn from_table(price_sar: f64) -> PriceQuote {
        PriceQuote {
            base_price: price_sar,
            brand_multiplier: STANDARD_BRAND_MULTIPLIER,
            category_multiplier: 1.0,
            final_price: price_sar.round() as i64,
            source: PriceSource::Table,
        }
    }

    /// Итоговая цена: таблица, затем формула
    pub async fn quote(
        &self,
        catalog: &dyn CatalogProvider,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
        category: DeviceCategory,
        brand: &str,
        base_price: f64,
    ) -> PriceQuote {
        match catalog.get_service_price(device_model_id, service_type_id).await {
            Ok(Some(price)) => {
                debug!(
                    "Table price for model {} service {}: {}",
                    device_model_id, service_type_id, price
                );
                Self::from_table(price)
            }
            Ok(None) => self.estimate(category, brand, base_price),
            Err(e) => {
                warn!(
                    "Price table lookup failed for model {} service {}, using formula: {}",
                    device_model_id, service_type_id, e
                );
                self.estimate(category, brand, base_price)
            }
        }
    }
}
