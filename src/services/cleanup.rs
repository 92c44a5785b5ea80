use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::AppState;

pub struct CleanupService {
    state: Arc<AppState>,
}

impl CleanupService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Удаляет брошенные сессии мастера вместе с черновиками
    pub async fn run_cleanup(&self) -> usize {
        let ttl = Duration::from_secs(self.state.config.session.ttl_seconds);
        let removed = self.state.sessions.remove_idle(ttl).await;

        if removed == 0 {
            info!("🧹 No idle booking sessions to cleanup");
        } else {
            info!(
                "🧹 Removed {} idle booking sessions, {} still open",
                removed,
                self.state.sessions.len().await
            );
        }
        removed
    }

    /// Фоновая очистка с интервалом из конфигурации
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        let interval = Duration::from_secs(self.state.config.session.sweep_interval_seconds.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                self.run_cleanup().await;
            }
        })
    }
}
