//! Автоматический выключатель для вызовов внешних сервисов.
//!
//! После `failure_threshold` сбоев подряд запросы блокируются на `timeout`,
//! затем пропускается один пробный запрос.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::config::CircuitBreakerConfig;

/// Состояния "Автоматического выключателя" (Circuit Breaker).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// **Closed (Замкнуто)**: Нормальный режим работы. Запросы разрешены.
    Closed,
    /// **Open (Разомкнуто)**: Запросы временно запрещены после серии сбоев.
    Open,
    /// **HalfOpen (Полуоткрыто)**: После таймаута разрешен один пробный запрос.
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: RwLock<CircuitState>,
    /// Счетчик последовательных сбоев.
    failure_count: AtomicU32,
    /// Время последнего сбоя для расчета таймаута.
    last_failure: Mutex<Option<Instant>>,
    /// В состоянии HalfOpen уже выпущен пробный запрос.
    trial_in_flight: AtomicBool,
    failure_threshold: u32,
    timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicU32::new(0),
            last_failure: Mutex::new(None),
            trial_in_flight: AtomicBool::new(false),
            failure_threshold: failure_threshold.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, Duration::from_secs(config.timeout_seconds))
    }

    /// Проверяет, можно ли выполнить следующий запрос к сервису.
    /// В HalfOpen разрешается ровно один запрос до его результата.
    pub fn can_execute(&self) -> bool {
        let current = *self.state.read().unwrap_or_else(|e| e.into_inner());

        match current {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => self.start_trial(),
            CircuitState::Open => {
                let last_failure = *self.last_failure.lock().unwrap_or_else(|e| e.into_inner());
                let elapsed = last_failure.map(|at| at.elapsed()).unwrap_or(Duration::MAX);

                if elapsed < self.timeout {
                    return false;
                }
                {
                    let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
                    if *state == CircuitState::Open {
                        *state = CircuitState::HalfOpen;
                        info!("Circuit breaker transitioning to HalfOpen state");
                    }
                }
                self.start_trial()
            }
        }
    }

    fn start_trial(&self) -> bool {
        self.trial_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Регистрирует успешное выполнение запроса.
    pub fn record_success(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *state == CircuitState::HalfOpen {
            info!("Circuit breaker recovered - transitioning to Closed state");
            *state = CircuitState::Closed;
        }
        self.failure_count.store(0, Ordering::Relaxed);
        self.trial_in_flight.store(false, Ordering::Release);
    }

    /// Регистрирует неудачное выполнение запроса.
    pub fn record_failure(&self) {
        let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
        self.trial_in_flight.store(false, Ordering::Release);

        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        match *state {
            CircuitState::Closed if failure_count >= self.failure_threshold => {
                *state = CircuitState::Open;
                error!(
                    "Circuit breaker OPENED - {} failures reached threshold {}",
                    failure_count, self.failure_threshold
                );
            }
            CircuitState::HalfOpen => {
                *state = CircuitState::Open;
                warn!("Circuit breaker test failed - returning to Open state");
            }
            _ => {}
        }
    }

    pub fn state(&self) -> CircuitState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count.load(Ordering::Relaxed)
    }
}
