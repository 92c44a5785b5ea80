use serde::{Deserialize, Serialize};

use super::{CatalogId, LocalizedText};

/// Вид ремонта. Не зависит от устройства.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceType {
    pub id: CatalogId,
    pub name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub estimated_duration_minutes: u32,
    /// Базовая цена в SAR для расчета по формуле
    pub base_price: f64,
}
