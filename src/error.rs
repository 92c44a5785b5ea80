use thiserror::Error;

use crate::models::{CatalogId, DraftField};

/// Ошибка обращения к справочнику. Не фатальна, запрос можно повторить.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Transport(String),

    #[error("catalog responded with status {0}")]
    Status(u16),

    #[error("catalog response could not be decoded: {0}")]
    Decode(String),

    #[error("device type {0} does not exist")]
    UnknownDeviceType(CatalogId),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return FetchError::Decode(e.to_string());
        }
        match e.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(e.to_string()),
        }
    }
}

/// Что именно выбрал пользователь, но чего нет в справочнике
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    DeviceType(CatalogId),
    DeviceModel(CatalogId),
    ServiceType(CatalogId),
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selection::DeviceType(id) => write!(f, "device type {}", id),
            Selection::DeviceModel(id) => write!(f, "device model {}", id),
            Selection::ServiceType(id) => write!(f, "service type {}", id),
        }
    }
}

/// Все отказы мастера. Ни один из них не ломает состояние:
/// после любой ошибки действие можно повторить.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("required field is missing: {field}")]
    Validation { field: DraftField },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("booking was not accepted: {reason}")]
    Submission { reason: String },

    #[error("{action} is not allowed at step {step}")]
    InvalidTransition { action: &'static str, step: &'static str },

    #[error("{0} is not available for selection")]
    UnknownSelection(Selection),

    #[error("device models are still loading")]
    ModelsLoading,

    #[error("booking submission is already in progress")]
    SubmissionInFlight,
}

pub type WizardResult<T> = Result<T, WizardError>;
