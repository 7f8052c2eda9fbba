//! ideaboard-client - client-side state core for the Ideaboard app
//!
//! This crate keeps local state consistent with the authoritative backend:
//! - Session bootstrap with silent renewal and guest fallback
//! - Proactive, cooldown-gated token refresh scheduling
//! - Optimistic create/update/delete reconciliation for ideas
//! - A reqwest-backed gateway to the Ideaboard REST API
//!
//! All work runs as non-blocking tasks on one execution context; see the
//! current-thread runtime in the demo binary.

pub mod config;
pub mod gateway;
pub mod ideas;
pub mod session;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use config::Config;
use gateway::{Gateway, GatewayError, Principal};
use ideas::engine::IdeaEngine;
use session::refresh::RefreshScheduler;
use session::store::SessionStore;

/// Top-level handle wiring the session store, refresh scheduler, and
/// mutation engine around one gateway.
pub struct Client {
    pub config: Config,
    pub gateway: Arc<dyn Gateway>,
    pub ideas: IdeaEngine,
    live: CancellationToken,
    pub scheduler: RefreshScheduler,
    pub session: SessionStore,
}

impl Client {
    pub fn new(config: Config, gateway: Arc<dyn Gateway>) -> Self {
        let live = CancellationToken::new();
        let session = SessionStore::new();
        let scheduler = RefreshScheduler::new(
            Arc::clone(&gateway),
            session.clone(),
            &config.refresh,
            live.clone(),
        );
        let ideas = IdeaEngine::new(Arc::clone(&gateway), session.clone(), scheduler.clone());

        Self {
            config,
            gateway,
            ideas,
            live,
            scheduler,
            session,
        }
    }

    /// Resolve the initial session and, if one exists, arm the renewal
    /// timer. Always settles; never returns an error.
    pub async fn bootstrap(&self) {
        session::bootstrap::bootstrap(
            Arc::clone(&self.gateway),
            self.session.clone(),
            self.live.clone(),
        )
        .await;

        if let Some(expires_at) = self.session.expires_at() {
            self.scheduler.observe_expiry(expires_at);
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, GatewayError> {
        let auth = self.gateway.login(email, password).await?;
        Ok(self.adopt_session(auth))
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<Principal, GatewayError> {
        let auth = self.gateway.signup(email, password).await?;
        Ok(self.adopt_session(auth))
    }

    /// Drop the local session regardless of the remote call's outcome;
    /// logout is idempotent.
    pub async fn logout(&self) {
        if let Err(e) = self.gateway.logout().await {
            debug!(error = %e, "Remote logout failed, clearing local session anyway");
        }
        self.scheduler.drop_session();
    }

    /// Foreground-visibility hook for the embedding shell.
    pub async fn foreground(&self) {
        self.scheduler.on_foreground().await;
    }

    /// Tear down: suppresses late state writes and lets armed timers exit.
    pub fn shutdown(&self) {
        self.live.cancel();
    }

    fn adopt_session(&self, auth: gateway::AuthSession) -> Principal {
        self.session.sign_in(auth.user.clone(), auth.expires_at);
        self.scheduler.observe_expiry(auth.expires_at);
        session::bootstrap::spawn_profile_fetch(
            Arc::clone(&self.gateway),
            self.session.clone(),
            self.live.clone(),
        );
        auth.user
    }
}
