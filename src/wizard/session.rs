use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{BookingWizard, WizardConfig, WizardStep, WizardView};
use crate::catalog::CatalogProvider;
use crate::error::{WizardError, WizardResult};
use crate::models::{CatalogId, ContactInfo, ContactPatch, SubmissionOutcome};
use crate::pricing::PricingEngine;
use crate::services::submission::SubmissionSink;

/// Сессия мастера: сам мастер плюс справочник, получатель заявок и расчет цены.
///
/// Блокировка мастера держится только на время синхронного перехода и
/// никогда не удерживается через `.await`. Поэтому запросы к справочнику и
/// отправка заявки могут пересекаться с другими действиями пользователя,
/// а устаревшие результаты отбрасывает сам мастер.
pub struct BookingSession {
    id: Uuid,
    wizard: Arc<Mutex<BookingWizard>>,
    catalog: Arc<dyn CatalogProvider>,
    sink: Arc<dyn SubmissionSink>,
    pricing: PricingEngine,
    created_at: Instant,
    /// Миллисекунды от `created_at` до последнего обращения
    last_touch_ms: AtomicU64,
}

impl BookingSession {
    pub fn new(
        config: WizardConfig,
        catalog: Arc<dyn CatalogProvider>,
        sink: Arc<dyn SubmissionSink>,
        pricing: PricingEngine,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wizard: Arc::new(Mutex::new(BookingWizard::new(config))),
            catalog,
            sink,
            pricing,
            created_at: Instant::now(),
            last_touch_ms: AtomicU64::new(0),
        }
    }

    /// Создает сессию и загружает справочники типов устройств и услуг
    pub async fn start(
        config: WizardConfig,
        catalog: Arc<dyn CatalogProvider>,
        sink: Arc<dyn SubmissionSink>,
        pricing: PricingEngine,
    ) -> WizardResult<Self> {
        let session = Self::new(config, catalog, sink, pricing);
        session.load_reference_data().await?;
        info!("Booking session {} started", session.id);
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_touch_ms.store(elapsed, Ordering::Relaxed);
    }

    /// Сколько времени сессия не использовалась
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_touch_ms.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(last)
    }

    pub async fn load_reference_data(&self) -> WizardResult<()> {
        self.touch();
        let (device_types, service_types) = tokio::try_join!(
            self.catalog.get_device_types(),
            self.catalog.get_service_types()
        )?;
        self.wizard
            .lock()
            .await
            .load_reference_data(device_types, service_types);
        Ok(())
    }

    pub async fn view(&self) -> WizardView {
        self.touch();
        self.wizard.lock().await.view()
    }

    pub async fn step(&self) -> WizardStep {
        self.wizard.lock().await.step()
    }

    /// Выбор типа устройства и загрузка его моделей.
    ///
    /// Если пока шел запрос пользователь выбрал другой тип, ответ отбрасывается
    /// и возвращается текущее состояние. Ошибка загрузки видна в `device_models`
    /// и возвращается как `WizardError::Fetch`.
    pub async fn select_device_type(&self, device_type_id: CatalogId) -> WizardResult<WizardView> {
        self.touch();
        let ticket = self.wizard.lock().await.select_device_type(device_type_id)?;

        let Some(ticket) = ticket else {
            return Ok(self.view().await);
        };

        let result = self.catalog.get_device_models(device_type_id).await;
        let failure = result.as_ref().err().cloned();

        let mut wizard = self.wizard.lock().await;
        let applied = wizard.apply_models(ticket, result);
        match failure {
            Some(e) if applied => Err(WizardError::Fetch(e)),
            _ => Ok(wizard.view()),
        }
    }

    pub async fn select_device_model(&self, device_model_id: CatalogId) -> WizardResult<WizardView> {
        self.touch();
        self.wizard.lock().await.select_device_model(device_model_id)?;
        self.refresh_quote().await;
        Ok(self.view().await)
    }

    pub async fn select_service_type(&self, service_type_id: CatalogId) -> WizardResult<WizardView> {
        self.touch();
        self.wizard.lock().await.select_service_type(service_type_id)?;
        self.refresh_quote().await;
        Ok(self.view().await)
    }

    /// Пересчитать цену для текущего выбора: таблица цен, затем формула
    async fn refresh_quote(&self) {
        let Some(inputs) = self.wizard.lock().await.pricing_inputs() else {
            return;
        };

        let quote = self
            .pricing
            .quote(
                self.catalog.as_ref(),
                inputs.device_model_id,
                inputs.service_type_id,
                inputs.category,
                &inputs.brand,
                inputs.base_price,
            )
            .await;

        debug!("Quote for session {}: {} SAR", self.id, quote.final_price);
        self.wizard.lock().await.set_quote(&inputs, quote);
    }

    pub async fn set_description(&self, description: String) -> WizardResult<WizardView> {
        self.touch();
        let mut wizard = self.wizard.lock().await;
        wizard.set_description(description)?;
        Ok(wizard.view())
    }

    pub async fn set_contact(&self, contact: ContactInfo) -> WizardResult<WizardView> {
        self.touch();
        let mut wizard = self.wizard.lock().await;
        wizard.set_contact(contact)?;
        Ok(wizard.view())
    }

    pub async fn patch_contact(&self, patch: ContactPatch) -> WizardResult<WizardView> {
        self.touch();
        let mut wizard = self.wizard.lock().await;
        wizard.patch_contact(patch)?;
        Ok(wizard.view())
    }

    pub async fn advance(&self) -> WizardResult<WizardView> {
        self.touch();
        let mut wizard = self.wizard.lock().await;
        wizard.advance()?;
        Ok(wizard.view())
    }

    pub async fn retreat(&self) -> WizardResult<WizardView> {
        self.touch();
        let mut wizard = self.wizard.lock().await;
        wizard.retreat()?;
        Ok(wizard.view())
    }

    /// Отправка заявки. Пока запрос в пути, повторные вызовы получают
    /// `SubmissionInFlight` и до внешнего сервиса не доходят.
    ///
    /// Запрос и применение ответа выполняются в отдельной задаче: если
    /// вызывающий бросит future (клиент отключился, таймаут), ответ сервиса
    /// все равно попадет в мастер и флаг отправки будет снят.
    pub async fn submit(&self) -> WizardResult<Option<String>> {
        self.touch();
        let request = self.wizard.lock().await.begin_submit()?;

        let wizard = self.wizard.clone();
        let sink = self.sink.clone();
        let task = tokio::spawn(async move {
            let outcome = sink.submit(&request).await;
            wizard.lock().await.finish_submit(outcome)
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Submission task for session {} failed: {}", self.id, e);
                self.wizard.lock().await.finish_submit(SubmissionOutcome::Rejected {
                    reason: "booking submission was interrupted".to_string(),
                })
            }
        }
    }
}
