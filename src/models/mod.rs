pub mod localized;
pub mod device;
pub mod service;
pub mod quote;
pub mod booking;

pub use localized::{Language, LocalizedText};
pub use device::{DeviceCategory, DeviceModel, DeviceType};
pub use service::ServiceType;
pub use quote::{PriceQuote, PriceSource};
pub use booking::{BookingDraft, BookingRequest, ContactInfo, ContactPatch, DraftField, SubmissionOutcome};

/// Идентификатор записи справочника
pub type CatalogId = i64;
