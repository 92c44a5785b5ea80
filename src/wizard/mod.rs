//! wizard
//!
//! Мастер записи на ремонт: пять шагов, каждый открывается только после
//! заполнения предыдущего.
//!
//! `DeviceType -> DeviceModel -> ServiceType -> Description -> ContactAndSummary -> Submitted`
//!
//! [`BookingWizard`] - чистая синхронная машина состояний, без ввода-вывода.
//! Загрузка моделей и отправка заявки выполняются снаружи (см. [`session`]),
//! а мастер выдает "билеты" и проверяет, что пришедший результат еще актуален:
//! 1.  **Загрузка моделей**: выбор типа устройства выдает [`ModelFetch`]. Результат
//!     применяется только если билет последний и тип устройства не сменился.
//! 2.  **Отправка**: [`BookingWizard::begin_submit`] ставит флаг `submitting`, повторный
//!     вызов до [`BookingWizard::finish_submit`] отклоняется, во внешний сервис
//!     уходит ровно одна заявка.

pub mod session;
pub mod view;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FetchError, Selection, WizardError, WizardResult};
use crate::models::{
    BookingDraft, BookingRequest, CatalogId, ContactInfo, ContactPatch, DeviceCategory, DeviceModel,
    DeviceType, DraftField, Language, PriceQuote, ServiceType, SubmissionOutcome,
};

pub use session::BookingSession;
pub use view::WizardView;

/// Шаги мастера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    DeviceType,
    DeviceModel,
    ServiceType,
    Description,
    ContactAndSummary,
    /// Заявка принята, мастер завершен
    Submitted,
}

impl WizardStep {
    pub fn index(self) -> usize {
        match self {
            WizardStep::DeviceType => 0,
            WizardStep::DeviceModel => 1,
            WizardStep::ServiceType => 2,
            WizardStep::Description => 3,
            WizardStep::ContactAndSummary => 4,
            WizardStep::Submitted => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::DeviceType => "device_type",
            WizardStep::DeviceModel => "device_model",
            WizardStep::ServiceType => "service_type",
            WizardStep::Description => "description",
            WizardStep::ContactAndSummary => "contact_and_summary",
            WizardStep::Submitted => "submitted",
        }
    }

    fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::DeviceType => Some(WizardStep::DeviceModel),
            WizardStep::DeviceModel => Some(WizardStep::ServiceType),
            WizardStep::ServiceType => Some(WizardStep::Description),
            WizardStep::Description => Some(WizardStep::ContactAndSummary),
            WizardStep::ContactAndSummary | WizardStep::Submitted => None,
        }
    }

    fn prev(self) -> Option<WizardStep> {
        match self {
            WizardStep::DeviceType | WizardStep::Submitted => None,
            WizardStep::DeviceModel => Some(WizardStep::DeviceType),
            WizardStep::ServiceType => Some(WizardStep::DeviceModel),
            WizardStep::Description => Some(WizardStep::ServiceType),
            WizardStep::ContactAndSummary => Some(WizardStep::Description),
        }
    }
}

/// Состояние списка моделей для выбранного типа устройства
#[derive(Debug, Clone, PartialEq)]
pub enum ModelList {
    Idle,
    Loading {
        device_type_id: CatalogId,
    },
    Loaded {
        device_type_id: CatalogId,
        models: Vec<DeviceModel>,
    },
    Failed {
        device_type_id: CatalogId,
        message: String,
    },
}

/// Билет на загрузку моделей. Результат принимается только по последнему билету.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFetch {
    pub device_type_id: CatalogId,
    seq: u64,
}

/// Входные данные для расчета цены по текущему выбору
#[derive(Debug, Clone, PartialEq)]
pub struct PricingInputs {
    pub device_model_id: CatalogId,
    pub service_type_id: CatalogId,
    pub category: DeviceCategory,
    pub brand: String,
    pub base_price: f64,
}

/// Настройки мастера, которые раньше брались из глобального состояния UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WizardConfig {
    pub language: Language,
}

#[derive(Debug, Clone)]
pub struct BookingWizard {
    config: WizardConfig,
    step: WizardStep,
    draft: BookingDraft,
    device_types: Vec<DeviceType>,
    service_types: Vec<ServiceType>,
    models: ModelList,
    fetch_seq: u64,
    quote: Option<PriceQuote>,
    submitting: bool,
    idempotency_key: Option<Uuid>,
    reference: Option<String>,
}

impl BookingWizard {
    pub fn new(config: WizardConfig) -> Self {
        Self {
            config,
            step: WizardStep::DeviceType,
            draft: BookingDraft::default(),
            device_types: Vec::new(),
            service_types: Vec::new(),
            models: ModelList::Idle,
            fetch_seq: 0,
            quote: None,
            submitting: false,
            idempotency_key: None,
            reference: None,
        }
    }

    /// Справочники, которые загружаются один раз при открытии мастера
    pub fn load_reference_data(
        &mut self,
        device_types: Vec<DeviceType>,
        service_types: Vec<ServiceType>,
    ) {
        debug!(
            "Wizard reference data: {} device types, {} service types",
            device_types.len(),
            service_types.len()
        );
        self.device_types = device_types;
        self.service_types = service_types;
    }

    pub fn config(&self) -> WizardConfig {
        self.config
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn models(&self) -> &ModelList {
        &self.models
    }

    pub fn device_types(&self) -> &[DeviceType] {
        &self.device_types
    }

    pub fn service_types(&self) -> &[ServiceType] {
        &self.service_types
    }

    pub fn quote(&self) -> Option<&PriceQuote> {
        self.quote.as_ref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Номер заявки, выданный внешним сервисом
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn selected_device_type(&self) -> Option<&DeviceType> {
        let id = self.draft.device_type_id?;
        self.device_types.iter().find(|t| t.id == id)
    }

    pub fn selected_service_type(&self) -> Option<&ServiceType> {
        let id = self.draft.service_type_id?;
        self.service_types.iter().find(|s| s.id == id)
    }

    // === Переходы ===

    pub fn advance(&mut self) -> WizardResult<WizardStep> {
        self.ensure_editable("advance")?;
        let next = self.step.next().ok_or(WizardError::InvalidTransition {
            action: "advance",
            step: self.step.as_str(),
        })?;

        if let Some(field) = self.missing_for_step(self.step) {
            warn!("Cannot leave step {}: {} is required", self.step.as_str(), field);
            return Err(WizardError::Validation { field });
        }

        debug!("Wizard step {} -> {}", self.step.as_str(), next.as_str());
        self.step = next;
        Ok(next)
    }

    /// Шаг назад. Данные не очищаются.
    pub fn retreat(&mut self) -> WizardResult<WizardStep> {
        self.ensure_editable("retreat")?;
        let prev = self.step.prev().ok_or(WizardError::InvalidTransition {
            action: "retreat",
            step: self.step.as_str(),
        })?;

        debug!("Wizard step {} -> {}", self.step.as_str(), prev.as_str());
        self.step = prev;
        Ok(prev)
    }

    fn missing_for_step(&self, step: WizardStep) -> Option<DraftField> {
        match step {
            WizardStep::DeviceType => {
                self.draft.device_type_id.is_none().then_some(DraftField::DeviceTypeId)
            }
            WizardStep::DeviceModel => {
                self.draft.device_model_id.is_none().then_some(DraftField::DeviceModelId)
            }
            WizardStep::ServiceType => {
                self.draft.service_type_id.is_none().then_some(DraftField::ServiceTypeId)
            }
            WizardStep::Description => self
                .draft
                .description
                .trim()
                .is_empty()
                .then_some(DraftField::Description),
            WizardStep::ContactAndSummary | WizardStep::Submitted => None,
        }
    }

    fn ensure_editable(&self, action: &'static str) -> WizardResult<()> {
        if self.step == WizardStep::Submitted {
            return Err(WizardError::InvalidTransition {
                action,
                step: self.step.as_str(),
            });
        }
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        Ok(())
    }

    fn ensure_step(&self, expected: WizardStep, action: &'static str) -> WizardResult<()> {
        if self.step != expected {
            return Err(WizardError::InvalidTransition {
                action,
                step: self.step.as_str(),
            });
        }
        Ok(())
    }

    // === Выбор ===

    /// Выбор типа устройства.
    ///
    /// Новый тип сбрасывает выбранную модель и цену и запускает загрузку моделей.
    /// Повторный выбор того же типа после ошибки загрузки тоже загружает заново.
    /// Если модели этого типа уже загружены, возвращает `None`.
    pub fn select_device_type(&mut self, device_type_id: CatalogId) -> WizardResult<Option<ModelFetch>> {
        self.ensure_editable("select device type")?;
        self.ensure_step(WizardStep::DeviceType, "select device type")?;

        if !self.device_types.iter().any(|t| t.id == device_type_id) {
            warn!("Device type {} is not in the catalog", device_type_id);
            return Err(WizardError::UnknownSelection(Selection::DeviceType(device_type_id)));
        }

        if self.draft.device_type_id == Some(device_type_id) {
            if matches!(self.models, ModelList::Loaded { .. }) {
                return Ok(None);
            }
        } else {
            if let Some(stale) = self.draft.device_model_id.take() {
                debug!("Device type changed, clearing model {}", stale);
            }
            self.quote = None;
            self.draft.device_type_id = Some(device_type_id);
        }

        self.fetch_seq += 1;
        self.models = ModelList::Loading { device_type_id };
        Ok(Some(ModelFetch {
            device_type_id,
            seq: self.fetch_seq,
        }))
    }

    /// Применить результат загрузки моделей. Возвращает `false`, если результат устарел.
    pub fn apply_models(
        &mut self,
        ticket: ModelFetch,
        result: Result<Vec<DeviceModel>, FetchError>,
    ) -> bool {
        if ticket.seq != self.fetch_seq || self.draft.device_type_id != Some(ticket.device_type_id) {
            debug!(
                "Discarding stale models for device type {} (current {:?})",
                ticket.device_type_id, self.draft.device_type_id
            );
            return false;
        }

        let device_type_id = ticket.device_type_id;
        self.models = match result {
            Ok(models) => ModelList::Loaded {
                device_type_id,
                models: models
                    .into_iter()
                    .filter(|m| m.device_type_id == device_type_id)
                    .collect(),
            },
            Err(e) => {
                warn!("Failed to load models for device type {}: {}", device_type_id, e);
                ModelList::Failed {
                    device_type_id,
                    message: e.to_string(),
                }
            }
        };
        true
    }

    pub fn select_device_model(&mut self, device_model_id: CatalogId) -> WizardResult<()> {
        self.ensure_editable("select device model")?;
        self.ensure_step(WizardStep::DeviceModel, "select device model")?;
        let current_type = self.draft.device_type_id.ok_or(WizardError::Validation {
            field: DraftField::DeviceTypeId,
        })?;

        match &self.models {
            ModelList::Loading { .. } => Err(WizardError::ModelsLoading),
            ModelList::Loaded {
                device_type_id,
                models,
            } if *device_type_id == current_type
                && models.iter().any(|m| m.id == device_model_id) =>
            {
                if self.draft.device_model_id != Some(device_model_id) {
                    self.draft.device_model_id = Some(device_model_id);
                    self.quote = None;
                }
                Ok(())
            }
            _ => {
                warn!(
                    "Device model {} is not offered for device type {}",
                    device_model_id, current_type
                );
                Err(WizardError::UnknownSelection(Selection::DeviceModel(device_model_id)))
            }
        }
    }

    pub fn select_service_type(&mut self, service_type_id: CatalogId) -> WizardResult<()> {
        self.ensure_editable("select service type")?;
        self.ensure_step(WizardStep::ServiceType, "select service type")?;

        if !self.service_types.iter().any(|s| s.id == service_type_id) {
            warn!("Service type {} is not in the catalog", service_type_id);
            return Err(WizardError::UnknownSelection(Selection::ServiceType(service_type_id)));
        }
        if self.draft.service_type_id != Some(service_type_id) {
            self.draft.service_type_id = Some(service_type_id);
            self.quote = None;
        }
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> WizardResult<()> {
        self.ensure_editable("edit description")?;
        self.ensure_step(WizardStep::Description, "edit description")?;
        self.draft.description = description.into();
        Ok(())
    }

    pub fn set_contact(&mut self, contact: ContactInfo) -> WizardResult<()> {
        self.ensure_editable("edit contact")?;
        self.ensure_step(WizardStep::ContactAndSummary, "edit contact")?;
        self.draft.contact = contact;
        Ok(())
    }

    pub fn patch_contact(&mut self, patch: ContactPatch) -> WizardResult<()> {
        self.ensure_editable("edit contact")?;
        self.ensure_step(WizardStep::ContactAndSummary, "edit contact")?;
        patch.apply_to(&mut self.draft.contact);
        Ok(())
    }

    // === Цена ===

    pub fn pricing_inputs(&self) -> Option<PricingInputs> {
        let device_type = self.selected_device_type()?;
        let device_model_id = self.draft.device_model_id?;
        let service = self.selected_service_type()?;
        Some(PricingInputs {
            device_model_id,
            service_type_id: service.id,
            category: device_type.category,
            brand: device_type.brand.clone(),
            base_price: service.base_price,
        })
    }

    /// Сохранить цену, если выбор с момента расчета не изменился
    pub fn set_quote(&mut self, inputs: &PricingInputs, quote: PriceQuote) -> bool {
        if self.pricing_inputs().as_ref() != Some(inputs) {
            debug!("Discarding quote for outdated selection");
            return false;
        }
        self.quote = Some(quote);
        true
    }

    // === Отправка ===

    /// Проверяет черновик и возвращает заявку для отправки.
    /// Пока отправка не завершена, повторные вызовы отклоняются.
    pub fn begin_submit(&mut self) -> WizardResult<BookingRequest> {
        if self.submitting {
            warn!("Submission already in progress, ignoring repeated submit");
            return Err(WizardError::SubmissionInFlight);
        }
        self.ensure_step(WizardStep::ContactAndSummary, "submit")?;

        // Ключ один на все попытки, чтобы внешний сервис мог отсечь дубли
        let key = *self.idempotency_key.get_or_insert_with(Uuid::new_v4);
        let request = self
            .draft
            .to_request(key, self.quote.clone(), self.config.language)
            .map_err(|field| {
                warn!("Cannot submit booking: {} is required", field);
                WizardError::Validation { field }
            })?;

        self.submitting = true;
        info!("Submitting booking {}", key);
        Ok(request)
    }

    /// Применить ответ сервиса записи. Без начатой отправки ответ отклоняется.
    pub fn finish_submit(&mut self, outcome: SubmissionOutcome) -> WizardResult<Option<String>> {
        if !self.submitting {
            warn!("Ignoring submission outcome without a submit in flight");
            return Err(WizardError::InvalidTransition {
                action: "finish submit",
                step: self.step.as_str(),
            });
        }
        self.submitting = false;
        match outcome {
            SubmissionOutcome::Accepted { reference } => {
                info!(
                    "Booking {:?} accepted, reference {:?}",
                    self.idempotency_key, reference
                );
                self.step = WizardStep::Submitted;
                self.draft = BookingDraft::default();
                self.models = ModelList::Idle;
                self.quote = None;
                self.reference = reference.clone();
                Ok(reference)
            }
            SubmissionOutcome::Rejected { reason } => {
                warn!("Booking {:?} rejected: {}", self.idempotency_key, reason);
                Err(WizardError::Submission { reason })
            }
        }
    }

    pub fn view(&self) -> WizardView {
        WizardView::from_wizard(self)
    }
}
