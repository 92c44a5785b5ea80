use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Цена из таблицы цен для пары (модель, услуга)
    Table,
    /// Оценка по формуле base * brand * category
    Formula,
}

/// Рассчитанная цена. Не сохраняется, считается по запросу.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub base_price: f64,
    pub brand_multiplier: f64,
    pub category_multiplier: f64,
    /// Итог в целых SAR
    pub final_price: i64,
    pub source: PriceSource,
}
