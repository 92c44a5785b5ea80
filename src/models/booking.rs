use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{CatalogId, Language, PriceQuote};

/// Поле черновика, которое может оказаться незаполненным
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    DeviceTypeId,
    DeviceModelId,
    ServiceTypeId,
    Description,
    Name,
    Phone,
    Address,
    City,
}

impl DraftField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DraftField::DeviceTypeId => "device_type_id",
            DraftField::DeviceModelId => "device_model_id",
            DraftField::ServiceTypeId => "service_type_id",
            DraftField::Description => "description",
            DraftField::Name => "name",
            DraftField::Phone => "phone",
            DraftField::Address => "address",
            DraftField::City => "city",
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Контактные данные клиента
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ContactInfo {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    #[validate(custom(function = "not_blank"))]
    pub phone: String,
    #[validate(custom(function = "not_blank"))]
    pub address: String,
    #[validate(custom(function = "not_blank"))]
    pub city: String,
}

impl ContactInfo {
    /// Первое незаполненное поле в порядке формы
    pub fn missing_field(&self) -> Option<DraftField> {
        let errors = match self.validate() {
            Ok(()) => return None,
            Err(errors) => errors,
        };
        let errors = errors.errors();
        [DraftField::Name, DraftField::Phone, DraftField::Address, DraftField::City]
            .into_iter()
            .find(|field| errors.contains_key(field.as_str()))
    }
}

/// Частичное изменение контактов: `None` оставляет поле как есть
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
}

impl ContactPatch {
    pub fn apply_to(self, contact: &mut ContactInfo) {
        if let Some(name) = self.name {
            contact.name = name;
        }
        if let Some(phone) = self.phone {
            contact.phone = phone;
        }
        if let Some(address) = self.address {
            contact.address = address;
        }
        if let Some(city) = self.city {
            contact.city = city;
        }
    }
}

/// Рабочее состояние мастера
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    pub device_type_id: Option<CatalogId>,
    pub device_model_id: Option<CatalogId>,
    pub service_type_id: Option<CatalogId>,
    pub description: String,
    pub contact: ContactInfo,
}

impl BookingDraft {
    /// Превращает черновик в заявку. Все поля обязательны, текст обрезается
    /// по краям. Ошибка - первое незаполненное поле в порядке формы.
    pub fn to_request(
        &self,
        idempotency_key: Uuid,
        quote: Option<PriceQuote>,
        language: Language,
    ) -> Result<BookingRequest, DraftField> {
        let device_type_id = self.device_type_id.ok_or(DraftField::DeviceTypeId)?;
        let device_model_id = self.device_model_id.ok_or(DraftField::DeviceModelId)?;
        let service_type_id = self.service_type_id.ok_or(DraftField::ServiceTypeId)?;

        let request = BookingRequest {
            idempotency_key,
            device_type_id,
            device_model_id,
            service_type_id,
            description: self.description.trim().to_string(),
            contact: ContactInfo {
                name: self.contact.name.trim().to_string(),
                phone: self.contact.phone.trim().to_string(),
                address: self.contact.address.trim().to_string(),
                city: self.contact.city.trim().to_string(),
            },
            quote,
            language,
            created_at: Utc::now(),
        };

        match request.invalid_field() {
            Some(field) => Err(field),
            None => Ok(request),
        }
    }
}

/// Проверенная заявка, которая уходит во внешний сервис
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BookingRequest {
    pub idempotency_key: Uuid,
    pub device_type_id: CatalogId,
    pub device_model_id: CatalogId,
    pub service_type_id: CatalogId,
    #[validate(custom(function = "not_blank"))]
    pub description: String,
    #[validate(nested)]
    pub contact: ContactInfo,
    pub quote: Option<PriceQuote>,
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

impl BookingRequest {
    /// Первое поле, не прошедшее проверку, в порядке формы
    pub fn invalid_field(&self) -> Option<DraftField> {
        let errors = self.validate().err()?;
        if errors.errors().contains_key(DraftField::Description.as_str()) {
            return Some(DraftField::Description);
        }
        self.contact.missing_field()
    }
}

/// Ответ внешнего сервиса на заявку
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubmissionOutcome {
    Accepted { reference: Option<String> },
    Rejected { reason: String },
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }
}
