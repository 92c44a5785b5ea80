use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CatalogId, LocalizedText};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Phone,
    Tablet,
    Laptop,
    Other,
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceCategory::Phone => "phone",
            DeviceCategory::Tablet => "tablet",
            DeviceCategory::Laptop => "laptop",
            DeviceCategory::Other => "other",
        };
        f.write_str(s)
    }
}

/// Тип устройства: пара категория + бренд (например, phone/Apple)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: CatalogId,
    pub category: DeviceCategory,
    pub brand: String,
    pub name: LocalizedText,
}

/// Конкретная модель, принадлежит ровно одному типу устройства
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModel {
    pub id: CatalogId,
    pub device_type_id: CatalogId,
    pub name: LocalizedText,
    pub release_year: Option<i32>,
}
