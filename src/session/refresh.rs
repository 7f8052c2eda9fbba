//! Proactive session renewal.
//!
//! The scheduler keeps at most one armed timer, targeted at the refresh
//! buffer ahead of the known expiry. The timer and the foreground-visibility
//! hook both funnel into [`RefreshScheduler::attempt_refresh`], where a
//! cooldown gate collapses triggers that arrive close together into a single
//! remote call. A failed renewal drops the session; the next trigger is the
//! only retry path.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RefreshConfig;
use crate::gateway::Gateway;
use crate::session::store::SessionStore;

/// Why a renewal attempt was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The app regained foreground visibility
    Foreground,
    /// The armed timer fired
    Timer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    /// Not authenticated; nothing armed
    #[default]
    Idle,
    /// A renewal call is in flight
    Refreshing,
    /// Authenticated with a timer armed against the known expiry
    Scheduled,
}

#[derive(Default)]
struct Inner {
    last_attempt: Option<Instant>,
    state: SchedulerState,
    timer: Option<JoinHandle<()>>,
}

struct Shared {
    cooldown: Duration,
    gateway: Arc<dyn Gateway>,
    inner: Mutex<Inner>,
    refresh_buffer: chrono::Duration,
    shutdown: CancellationToken,
    store: SessionStore,
}

/// Cheaply cloneable handle; clones drive the same underlying schedule.
#[derive(Clone)]
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

impl RefreshScheduler {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: SessionStore,
        config: &RefreshConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                cooldown: Duration::from_secs(config.cooldown_seconds),
                gateway,
                inner: Mutex::new(Inner::default()),
                refresh_buffer: chrono::Duration::seconds(config.buffer_seconds as i64),
                shutdown,
                store,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// (Re)arm the timer against a newly observed expiry.
    ///
    /// Any previously armed timer is cancelled first — exactly one timer
    /// exists at a time. A target already in the past arms a zero delay,
    /// so the attempt fires immediately.
    pub fn observe_expiry(&self, expires_at: DateTime<Utc>) {
        let target = expires_at - self.shared.refresh_buffer;
        let delay = (target - Utc::now()).to_std().unwrap_or(Duration::ZERO);

        let mut inner = self.lock();
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.state = SchedulerState::Scheduled;

        let scheduler = self.clone();
        inner.timer = Some(tokio::spawn(async move {
            tokio::select! {
                _ = scheduler.shared.shutdown.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    scheduler.attempt_refresh(RefreshTrigger::Timer).await;
                }
            }
        }));

        debug!(delay_seconds = delay.as_secs(), "Renewal timer armed");
    }

    /// Foreground-visibility trigger: refresh now if the remaining lifetime
    /// is inside the buffer window, otherwise leave the armed timer alone.
    pub async fn on_foreground(&self) {
        let Some(expires_at) = self.shared.store.expires_at() else {
            return;
        };

        if expires_at - Utc::now() > self.shared.refresh_buffer {
            debug!("Foreground with plenty of lifetime left, no renewal needed");
            return;
        }

        self.attempt_refresh(RefreshTrigger::Foreground).await;
    }

    /// The single renewal entry point shared by all triggers.
    ///
    /// A trigger arriving inside the cooldown, or while another attempt is
    /// in flight, is a no-op rather than a queued retry.
    pub async fn attempt_refresh(&self, trigger: RefreshTrigger) {
        {
            let mut inner = self.lock();

            if inner.state == SchedulerState::Refreshing {
                debug!(?trigger, "Renewal already in flight, ignoring trigger");
                return;
            }
            if let Some(last) = inner.last_attempt {
                if last.elapsed() < self.shared.cooldown {
                    debug!(?trigger, "Renewal trigger inside cooldown, ignoring");
                    return;
                }
            }

            inner.last_attempt = Some(Instant::now());
            inner.state = SchedulerState::Refreshing;

            // The armed timer is consumed by this attempt. When the trigger
            // is the timer itself we are running inside that task, so the
            // handle is dropped rather than aborted.
            if let Some(timer) = inner.timer.take() {
                if trigger != RefreshTrigger::Timer {
                    timer.abort();
                }
            }
        }

        match self.shared.gateway.refresh_session().await {
            Ok(renewed) => {
                if self.shared.shutdown.is_cancelled() {
                    return;
                }
                info!(expires_at = %renewed.expires_at, ?trigger, "Session renewed");
                self.shared.store.set_authenticated(renewed.expires_at);
                self.observe_expiry(renewed.expires_at);
            }
            Err(e) => {
                if self.shared.shutdown.is_cancelled() {
                    return;
                }
                if e.is_auth_loss() {
                    info!(?trigger, "Renewal rejected, session is gone");
                } else {
                    warn!(error = %e, ?trigger, "Renewal failed");
                }
                self.drop_session();
            }
        }
    }

    /// Clear the session and disarm the timer.
    ///
    /// Also the entry point for other components that observe an
    /// unauthenticated response, so that losing the session and cancelling
    /// the timer always happen together.
    pub fn drop_session(&self) {
        {
            let mut inner = self.lock();
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            inner.state = SchedulerState::Idle;
        }
        self.shared.store.set_guest();
    }
}
