pub mod config;
pub mod error;
pub mod models;
pub mod catalog;
pub mod pricing;
pub mod wizard;
pub mod sessions;
pub mod services;
pub mod controllers;

use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::info;

use catalog::{CachedCatalog, CatalogProvider, HttpCatalogClient, InMemoryCatalog};
use pricing::PricingEngine;
use services::submission::{HttpSubmissionSink, RecordingSink, SubmissionSink};
use sessions::SessionStore;
use wizard::{BookingSession, WizardConfig};

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub catalog: Arc<dyn CatalogProvider>,
    pub sink: Arc<dyn SubmissionSink>,
    pub pricing: PricingEngine,
    pub sessions: SessionStore,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let catalog: Arc<dyn CatalogProvider> = match HttpCatalogClient::from_config(&config.catalog)? {
            Some(client) => {
                info!("Using remote catalog at {:?}", config.catalog.url);
                let cached = CachedCatalog::new(
                    Arc::new(client),
                    Duration::from_secs(config.catalog.cache_ttl_seconds),
                );

                // Прогрев кеша в фоне
                let for_warmup = cached.clone();
                task::spawn(async move {
                    for_warmup.warmup().await;
                });

                Arc::new(cached)
            }
            None => {
                info!("CATALOG_URL not set, using built-in catalog");
                Arc::new(InMemoryCatalog::seeded())
            }
        };

        let sink: Arc<dyn SubmissionSink> =
            match HttpSubmissionSink::from_config(&config.sink, &config.circuit_breaker)? {
                Some(sink) => {
                    info!("Sending bookings to {:?}", config.sink.url);
                    Arc::new(sink)
                }
                None => {
                    info!("BOOKING_SINK_URL not set, bookings are only recorded in memory");
                    Arc::new(RecordingSink::new())
                }
            };

        Ok(Arc::new(Self::with_parts(config, catalog, sink)))
    }

    pub fn with_parts(
        config: config::Config,
        catalog: Arc<dyn CatalogProvider>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        let pricing = PricingEngine::new(config.pricing.clone());
        Self {
            config,
            catalog,
            sink,
            pricing,
            sessions: SessionStore::new(),
        }
    }

    /// Новая сессия мастера со справочниками
    pub async fn open_session(
        &self,
        config: WizardConfig,
    ) -> Result<Arc<BookingSession>, error::WizardError> {
        let session = BookingSession::start(
            config,
            self.catalog.clone(),
            self.sink.clone(),
            self.pricing.clone(),
        )
        .await?;
        Ok(self.sessions.insert(session).await)
    }
}
