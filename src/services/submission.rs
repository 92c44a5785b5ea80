//! submission.rs
//!
//! Отправка готовых заявок во внешний сервис записи.
//!
//! Ключевые компоненты:
//! 1.  **SubmissionSink**: трейт получателя заявок. Ответ всегда `SubmissionOutcome`,
//!     сетевые сбои превращаются в отказ с причиной, а не в панику.
//! 2.  **HttpSubmissionSink**: клиент внешнего сервиса. Заявка подписывается токеном
//!     SHA-256, все вызовы идут через `CircuitBreaker`.
//! 3.  **RecordingSink**: заявки сохраняются в памяти. Используется, когда внешний
//!     сервис не настроен, и в тестах.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::config::{CircuitBreakerConfig, SinkConfig};
use crate::models::{BookingRequest, SubmissionOutcome};

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, request: &BookingRequest) -> SubmissionOutcome;
}

/// Ошибки, которые могут возникнуть при работе через Circuit Breaker.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError {
    #[error("circuit breaker is open - booking service temporarily unavailable")]
    Open,
    #[error("booking service error: {0}")]
    Gateway(#[from] reqwest::Error),
}

/// Конверт заявки для внешнего сервиса.
#[derive(Debug, Serialize)]
struct SubmitEnvelope<'a> {
    token: String,
    booking: &'a BookingRequest,
}

/// Ответ внешнего сервиса.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    success: bool,
    reference: Option<String>,
    reason: Option<String>,
}

/// Клиент внешнего сервиса записи.
#[derive(Clone)]
pub struct HttpSubmissionSink {
    url: String,
    /// Секрет для подписи заявок.
    secret: String,
    http_client: reqwest::Client,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl HttpSubmissionSink {
    pub fn new(
        url: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
        circuit_breaker: CircuitBreaker,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            url: url.into(),
            secret: secret.into(),
            http_client: reqwest::Client::builder().timeout(timeout).build()?,
            circuit_breaker: Arc::new(circuit_breaker),
        })
    }

    /// `None`, если url сервиса записи не задан
    pub fn from_config(
        config: &SinkConfig,
        breaker: &CircuitBreakerConfig,
    ) -> Result<Option<Self>, reqwest::Error> {
        config
            .url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    config.secret.clone(),
                    Duration::from_secs(config.timeout_seconds),
                    CircuitBreaker::from_config(breaker),
                )
            })
            .transpose()
    }

    /// Подпись заявки: sha256(idempotency_key + phone + secret) в hex.
    fn generate_token(&self, request: &BookingRequest) -> String {
        let token_string = format!(
            "{}{}{}",
            request.idempotency_key, request.contact.phone, self.secret
        );
        let mut hasher = Sha256::new();
        hasher.update(token_string.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Выполняет асинхронную операцию, пропуская её через Circuit Breaker.
    async fn execute_with_circuit_breaker<F, T>(&self, operation: F) -> Result<T, CircuitBreakerError>
    where
        F: std::future::Future<Output = Result<T, reqwest::Error>>,
    {
        if !self.circuit_breaker.can_execute() {
            warn!("Circuit breaker is OPEN - blocking booking service request");
            return Err(CircuitBreakerError::Open);
        }

        match operation.await {
            Ok(result) => {
                self.circuit_breaker.record_success();
                Ok(result)
            }
            Err(e) => {
                error!("Booking service request failed: {:?}", e);
                self.circuit_breaker.record_failure();
                Err(CircuitBreakerError::Gateway(e))
            }
        }
    }

    /// Сбоем сервиса считаются только сетевые ошибки и ответы 5xx.
    /// Ответ 4xx - это отказ в записи: причина берется из тела, если оно есть.
    async fn send(&self, envelope: &SubmitEnvelope<'_>) -> Result<SubmitResponse, reqwest::Error> {
        let response = self.http_client.post(&self.url).json(envelope).send().await?;
        let response = if response.status().is_server_error() {
            response.error_for_status()?
        } else {
            response
        };

        let status = response.status();
        match response.json::<SubmitResponse>().await {
            Ok(body) if status.is_client_error() => Ok(SubmitResponse {
                success: false,
                ..body
            }),
            Ok(body) => Ok(body),
            Err(_) if status.is_client_error() => Ok(SubmitResponse {
                success: false,
                reference: None,
                reason: Some(format!("booking service refused the request ({})", status)),
            }),
            Err(e) => Err(e),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }
}

#[async_trait]
impl SubmissionSink for HttpSubmissionSink {
    async fn submit(&self, request: &BookingRequest) -> SubmissionOutcome {
        let envelope = SubmitEnvelope {
            token: self.generate_token(request),
            booking: request,
        };

        info!(
            "Sending booking {} to booking service, circuit breaker state: {:?}",
            request.idempotency_key,
            self.circuit_breaker.state()
        );

        match self.execute_with_circuit_breaker(self.send(&envelope)).await {
            Ok(SubmitResponse { success: true, reference, .. }) => {
                SubmissionOutcome::Accepted { reference }
            }
            Ok(SubmitResponse { reason, .. }) => SubmissionOutcome::Rejected {
                reason: reason.unwrap_or_else(|| "booking was rejected".to_string()),
            },
            Err(e) => SubmissionOutcome::Rejected { reason: e.to_string() },
        }
    }
}

/// Заявки сохраняются в памяти. Ответы можно задать заранее.
#[derive(Clone, Default)]
pub struct RecordingSink {
    submissions: Arc<Mutex<Vec<BookingRequest>>>,
    scripted: Arc<Mutex<VecDeque<SubmissionOutcome>>>,
    delay: Option<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Задержка ответа, чтобы можно было поймать повторную отправку
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Следующие ответы будут взяты из очереди, потом - обычный прием
    pub fn with_outcomes(self, outcomes: impl IntoIterator<Item = SubmissionOutcome>) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(outcomes);
        self
    }

    pub fn submissions(&self) -> Vec<BookingRequest> {
        self.submissions.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count(&self) -> usize {
        self.submissions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn submit(&self, request: &BookingRequest) -> SubmissionOutcome {
        let number = {
            let mut submissions = self.submissions.lock().unwrap_or_else(|e| e.into_inner());
            submissions.push(request.clone());
            submissions.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let outcome = scripted.unwrap_or_else(|| SubmissionOutcome::Accepted {
            reference: Some(format!("RB-{:06}", number)),
        });
        info!(
            "Recorded booking {} for {} in {}: {:?}",
            request.idempotency_key, request.contact.name, request.contact.city, outcome
        );
        outcome
    }
}
