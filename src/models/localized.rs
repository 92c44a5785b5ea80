use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Язык интерфейса. Передается в мастер явно через конфигурацию.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Ar => write!(f, "ar"),
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(format!("unsupported language '{}'", other)),
        }
    }
}

/// Текст справочника на всех поддерживаемых языках
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub en: String,
    pub ar: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, ar: impl Into<String>) -> Self {
        Self { en: en.into(), ar: ar.into() }
    }

    // Пустой перевод подменяем английским текстом
    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::Ar if !self.ar.is_empty() => &self.ar,
            _ => &self.en,
        }
    }
}
