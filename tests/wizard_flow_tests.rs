//! Сценарии мастера записи через `BookingSession`:
//! гонка загрузки моделей, двойная отправка, полный проход до заявки.

use async_trait::async_trait;
use fake::faker::address::en::{CityName, StreetName};
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use repair_booking::catalog::{CatalogProvider, InMemoryCatalog};
use repair_booking::error::{FetchError, WizardError};
use repair_booking::models::{
    CatalogId, ContactInfo, DeviceModel, DeviceType, DraftField, ServiceType, SubmissionOutcome,
};
use repair_booking::pricing::PricingEngine;
use repair_booking::services::submission::RecordingSink;
use repair_booking::wizard::view::ModelsState;
use repair_booking::wizard::{BookingSession, WizardConfig, WizardStep};

/// Справочник, который отвечает на запрос моделей с задержкой для выбранного типа
struct SlowCatalog {
    inner: InMemoryCatalog,
    slow_type: CatalogId,
    delay: Duration,
}

#[async_trait]
impl CatalogProvider for SlowCatalog {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
        self.inner.get_device_types().await
    }

    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError> {
        if device_type_id == self.slow_type {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get_device_models(device_type_id).await
    }

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
        self.inner.get_service_types().await
    }

    async fn get_service_price(
        &self,
        device_model_id: CatalogId,
        service_type_id: CatalogId,
    ) -> Result<Option<f64>, FetchError> {
        self.inner.get_service_price(device_model_id, service_type_id).await
    }
}

/// Справочник, у которого первые запросы моделей падают
struct FailingModels {
    inner: InMemoryCatalog,
    failures: std::sync::atomic::AtomicU32,
}

#[async_trait]
impl CatalogProvider for FailingModels {
    async fn get_device_types(&self) -> Result<Vec<DeviceType>, FetchError> {
        self.inner.get_device_types().await
    }

    async fn get_device_models(
        &self,
        device_type_id: CatalogId,
    ) -> Result<Vec<DeviceModel>, FetchError> {
        use std::sync::atomic::Ordering;
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(FetchError::Status(503));
        }
        self.inner.get_device_models(device_type_id).await
    }

    async fn get_service_types(&self) -> Result<Vec<ServiceType>, FetchError> {
        self.inner.get_service_types().await
    }
}

fn fake_contact() -> ContactInfo {
    ContactInfo {
        name: Name().fake(),
        phone: PhoneNumber().fake(),
        address: StreetName().fake(),
        city: CityName().fake(),
    }
}

async fn start(catalog: Arc<dyn CatalogProvider>, sink: RecordingSink) -> Arc<BookingSession> {
    Arc::new(
        BookingSession::start(
            WizardConfig::default(),
            catalog,
            Arc::new(sink),
            PricingEngine::default(),
        )
        .await
        .expect("session should start"),
    )
}

/// Проходит шаги 0-3, оставляя мастер на шаге контактов
async fn fill_until_contact(session: &BookingSession, device_type: CatalogId, model: CatalogId) {
    session.select_device_type(device_type).await.unwrap();
    session.advance().await.unwrap();
    session.select_device_model(model).await.unwrap();
    session.advance().await.unwrap();
    session.select_service_type(1).await.unwrap();
    session.advance().await.unwrap();
    session
        .set_description("Screen cracked after a fall".to_string())
        .await
        .unwrap();
    session.advance().await.unwrap();
    assert_eq!(session.step().await, WizardStep::ContactAndSummary);
}

#[tokio::test]
async fn late_models_for_previous_device_type_are_dropped() {
    let catalog = Arc::new(SlowCatalog {
        inner: InMemoryCatalog::seeded(),
        slow_type: 1,
        delay: Duration::from_millis(150),
    });
    let session = start(catalog, RecordingSink::new()).await;

    let slow = {
        let session = session.clone();
        tokio::spawn(async move { session.select_device_type(1).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let view = session.select_device_type(2).await.unwrap();
    assert_eq!(view.device_models.state, ModelsState::Loaded);

    // ответ для типа 1 приходит позже и не должен заменить модели типа 2
    let late_view = slow.await.unwrap().unwrap();
    assert_eq!(late_view.draft.device_type_id, Some(2));
    let ids: Vec<CatalogId> = late_view.device_models.options.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![201, 202]);
}

#[tokio::test]
async fn failed_model_fetch_can_be_retried() {
    let catalog = Arc::new(FailingModels {
        inner: InMemoryCatalog::seeded(),
        failures: std::sync::atomic::AtomicU32::new(1),
    });
    let session = start(catalog, RecordingSink::new()).await;

    let err = session.select_device_type(4).await.unwrap_err();
    assert_eq!(err, WizardError::Fetch(FetchError::Status(503)));
    let view = session.view().await;
    assert_eq!(view.device_models.state, ModelsState::Failed);
    assert!(view.device_models.error.is_some());

    let view = session.select_device_type(4).await.unwrap();
    assert_eq!(view.device_models.state, ModelsState::Loaded);
    assert_eq!(view.device_models.options.len(), 2);
}

#[tokio::test]
async fn missing_phone_blocks_submission() {
    let sink = RecordingSink::new();
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;
    fill_until_contact(&session, 1, 101).await;

    let mut contact = fake_contact();
    contact.phone = String::new();
    session.set_contact(contact).await.unwrap();

    assert_eq!(
        session.submit().await,
        Err(WizardError::Validation { field: DraftField::Phone })
    );
    assert_eq!(sink.count(), 0);
}

#[tokio::test]
async fn rapid_repeated_submits_reach_sink_once() {
    let sink = RecordingSink::new().with_delay(Duration::from_millis(50));
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;
    fill_until_contact(&session, 2, 201).await;
    session.set_contact(fake_contact()).await.unwrap();

    let results = join_all((0..5).map(|_| session.submit())).await;

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let in_flight = results
        .iter()
        .filter(|r| matches!(r, Err(WizardError::SubmissionInFlight)))
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(in_flight, 4);
    assert_eq!(sink.count(), 1);

    // после успешной отправки мастер завершен
    assert!(matches!(
        session.submit().await,
        Err(WizardError::InvalidTransition { .. })
    ));
    assert_eq!(sink.count(), 1);
    assert_eq!(session.step().await, WizardStep::Submitted);
}

#[tokio::test]
async fn rejected_booking_can_be_resubmitted_with_same_key() {
    let sink = RecordingSink::new().with_outcomes([SubmissionOutcome::Rejected {
        reason: "booking service unavailable".to_string(),
    }]);
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;
    fill_until_contact(&session, 1, 102).await;
    session.set_contact(fake_contact()).await.unwrap();

    assert!(matches!(
        session.submit().await,
        Err(WizardError::Submission { .. })
    ));
    assert_eq!(session.step().await, WizardStep::ContactAndSummary);

    let reference = session.submit().await.unwrap();
    assert_eq!(reference.as_deref(), Some("RB-000002"));

    let submissions = sink.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].idempotency_key, submissions[1].idempotency_key);
}

#[tokio::test]
async fn submitted_request_has_no_stale_model() {
    let sink = RecordingSink::new();
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;

    // сначала iPhone 15 Pro, затем пользователь возвращается и выбирает Galaxy
    fill_until_contact(&session, 1, 101).await;
    for _ in 0..4 {
        session.retreat().await.unwrap();
    }
    let view = session.select_device_type(2).await.unwrap();
    assert_eq!(view.draft.device_model_id, None);
    assert_eq!(view.draft.service_type_id, Some(1));
    assert!(view.quote.is_none());

    session.advance().await.unwrap();
    session.select_device_model(202).await.unwrap();
    session.advance().await.unwrap();
    session.advance().await.unwrap();
    session.advance().await.unwrap();

    let contact = fake_contact();
    session.set_contact(contact.clone()).await.unwrap();
    session.submit().await.unwrap();

    let submissions = sink.submissions();
    assert_eq!(submissions.len(), 1);
    let request = &submissions[0];
    assert_eq!(request.device_type_id, 2);
    assert_eq!(request.device_model_id, 202);
    assert_eq!(request.service_type_id, 1);
    assert_eq!(request.description, "Screen cracked after a fall");
    assert_eq!(request.contact.name, contact.name.trim());
    assert_eq!(request.contact.city, contact.city.trim());
    // Samsung, phone, экран: 250 * 1.0 * 1.0
    assert_eq!(request.quote.as_ref().map(|q| q.final_price), Some(250));
}

#[tokio::test]
async fn abandoned_submit_still_lands_in_wizard() {
    let sink = RecordingSink::new().with_delay(Duration::from_millis(200));
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;
    fill_until_contact(&session, 1, 101).await;
    session.set_contact(fake_contact()).await.unwrap();

    // клиент ушел раньше, чем ответил сервис записи
    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.submit()).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let view = session.view().await;
    assert!(!view.submitting);
    assert_eq!(view.step, WizardStep::Submitted);
    assert_eq!(view.reference.as_deref(), Some("RB-000001"));
    assert_eq!(sink.count(), 1);
}

#[tokio::test]
async fn abandoned_rejected_submit_can_be_retried() {
    let sink = RecordingSink::new()
        .with_delay(Duration::from_millis(200))
        .with_outcomes([SubmissionOutcome::Rejected {
            reason: "booking service unavailable".to_string(),
        }]);
    let session = start(Arc::new(InMemoryCatalog::seeded()), sink.clone()).await;
    fill_until_contact(&session, 2, 201).await;
    session.set_contact(fake_contact()).await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.submit()).await;
    assert!(abandoned.is_err());
    tokio::time::sleep(Duration::from_millis(300)).await;

    // мастер снова редактируется
    assert!(!session.view().await.submitting);
    session.retreat().await.unwrap();
    session.advance().await.unwrap();

    let reference = session.submit().await.unwrap();
    assert_eq!(reference.as_deref(), Some("RB-000002"));
    let submissions = sink.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].idempotency_key, submissions[1].idempotency_key);
}
