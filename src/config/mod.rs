use serde::Deserialize;
use std::env;
use std::str::FromStr;
use tracing::warn;

use crate::models::Language;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub catalog: CatalogConfig,
    pub sink: SinkConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub pricing: PricingConfig,
    pub session: SessionConfig,
    /// Переменные с невалидными значениями, замененные значениями по умолчанию
    #[serde(skip)]
    pub invalid_vars: Vec<String>,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

// Источник справочника устройств и услуг.
// Если url не задан - используется встроенный справочник.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub url: Option<String>,
    pub timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
}

// Куда отправляются готовые заявки.
// Если url не задан - заявки только логируются и сохраняются в памяти.
#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    pub url: Option<String>,
    pub secret: String,
    pub timeout_seconds: u64,
}

// Настройки Circuit Breaker
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

// Настройки расчета цены
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub premium_brands: Vec<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            premium_brands: vec!["Apple".to_string()],
        }
    }
}

// Время жизни незавершенных сессий мастера
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let mut reader = EnvReader::default();
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: reader.parse_or("PORT", 8000),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "repair_booking=debug,tower_http=debug".to_string()),
                log_format: reader.parse_or("LOG_FORMAT", LogFormat::Pretty),
                language: reader.parse_or("DEFAULT_LANGUAGE", Language::En),
            },
            catalog: CatalogConfig {
                url: non_empty_var("CATALOG_URL"),
                timeout_seconds: reader.parse_or("CATALOG_TIMEOUT_SECONDS", 10),
                cache_ttl_seconds: reader.parse_or("CATALOG_CACHE_TTL_SECONDS", 3600),
            },
            sink: SinkConfig {
                url: non_empty_var("BOOKING_SINK_URL"),
                secret: env::var("BOOKING_SINK_SECRET").unwrap_or_default(),
                timeout_seconds: reader.parse_or("BOOKING_SINK_TIMEOUT_SECONDS", 30),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: reader.parse_or("CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5),
                timeout_seconds: reader.parse_or("CIRCUIT_BREAKER_TIMEOUT_SECONDS", 60),
            },
            pricing: PricingConfig {
                premium_brands: env::var("PREMIUM_BRANDS")
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|b| !b.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_else(|_| PricingConfig::default().premium_brands),
            },
            session: SessionConfig {
                ttl_seconds: reader.parse_or("SESSION_TTL_SECONDS", 1800),
                sweep_interval_seconds: reader.parse_or("SESSION_SWEEP_INTERVAL_SECONDS", 60),
            },
            // последним: к этому моменту все переменные прочитаны
            invalid_vars: reader.invalid,
        }
    }

    /// Вызывается после настройки логирования: сама конфигурация читается раньше
    pub fn log_invalid_vars(&self) {
        for var in &self.invalid_vars {
            warn!("{} has an invalid value, using default", var);
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Невалидное значение не роняет сервис - берем значение по умолчанию
#[derive(Default)]
struct EnvReader {
    invalid: Vec<String>,
}

impl EnvReader {
    fn parse_or<T: FromStr>(&mut self, key: &str, default: T) -> T {
        match env::var(key) {
            Ok(raw) => match raw.trim().parse() {
                Ok(value) => value,
                Err(_) => {
                    self.invalid.push(format!("{}='{}'", key, raw));
                    default
                }
            },
            Err(_) => default,
        }
    }
}
