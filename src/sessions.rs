use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::wizard::BookingSession;

/// Открытые сессии мастера
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<BookingSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: BookingSession) -> Arc<BookingSession> {
        let session = Arc::new(session);
        self.sessions
            .write()
            .await
            .insert(session.id(), session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<BookingSession>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Пользователь ушел из мастера - черновик выбрасывается
    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!("Booking session {} discarded", id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Удаляет сессии, которые не использовались дольше `ttl`.
    /// Возвращает число удаленных.
    pub async fn remove_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for() < ttl);
        before - sessions.len()
    }
}
