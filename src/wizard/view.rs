use serde::Serialize;

use super::{BookingWizard, ModelList, WizardStep};
use crate::models::{BookingDraft, CatalogId, Language, PriceQuote};

/// Вариант выбора с подписью на языке мастера
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionView {
    pub id: CatalogId,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceOptionView {
    pub id: CatalogId,
    pub label: String,
    pub description: Option<String>,
    pub estimated_duration_minutes: u32,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelsState {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Список моделей: вместо индикатора загрузки может быть ошибка
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelsView {
    pub state: ModelsState,
    pub error: Option<String>,
    pub options: Vec<OptionView>,
}

/// Снимок состояния мастера для клиента
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardView {
    pub step: WizardStep,
    pub step_index: usize,
    pub language: Language,
    pub draft: BookingDraft,
    pub device_types: Vec<OptionView>,
    pub device_models: ModelsView,
    pub service_types: Vec<ServiceOptionView>,
    pub quote: Option<PriceQuote>,
    pub submitting: bool,
    pub reference: Option<String>,
}

impl WizardView {
    pub fn from_wizard(wizard: &BookingWizard) -> Self {
        let language = wizard.config().language;
        let draft = wizard.draft();

        let device_types = wizard
            .device_types()
            .iter()
            .map(|t| OptionView {
                id: t.id,
                label: t.name.get(language).to_string(),
                selected: draft.device_type_id == Some(t.id),
            })
            .collect();

        let device_models = match wizard.models() {
            ModelList::Idle => ModelsView {
                state: ModelsState::Idle,
                error: None,
                options: Vec::new(),
            },
            ModelList::Loading { .. } => ModelsView {
                state: ModelsState::Loading,
                error: None,
                options: Vec::new(),
            },
            ModelList::Loaded { models, .. } => ModelsView {
                state: ModelsState::Loaded,
                error: None,
                options: models
                    .iter()
                    .map(|m| OptionView {
                        id: m.id,
                        label: m.name.get(language).to_string(),
                        selected: draft.device_model_id == Some(m.id),
                    })
                    .collect(),
            },
            ModelList::Failed { message, .. } => ModelsView {
                state: ModelsState::Failed,
                error: Some(message.clone()),
                options: Vec::new(),
            },
        };

        let service_types = wizard
            .service_types()
            .iter()
            .map(|s| ServiceOptionView {
                id: s.id,
                label: s.name.get(language).to_string(),
                description: s.description.as_ref().map(|d| d.get(language).to_string()),
                estimated_duration_minutes: s.estimated_duration_minutes,
                selected: draft.service_type_id == Some(s.id),
            })
            .collect();

        Self {
            step: wizard.step(),
            step_index: wizard.step().index(),
            language,
            draft: draft.clone(),
            device_types,
            device_models,
            service_types,
            quote: wizard.quote().cloned(),
            submitting: wizard.is_submitting(),
            reference: wizard.reference().map(str::to_string),
        }
    }
}
