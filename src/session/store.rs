//! The session store: a single shared record of who is signed in and until
//! when.
//!
//! Only the bootstrapper, the refresh scheduler, and the auth entry points
//! on [`crate::Client`] write here; every transition goes through one of the
//! methods below so the legal state machine is enforced in one place. The
//! store guarantees that an expiry instant is held exactly when the session
//! is authenticated.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::gateway::Principal;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    /// Signed in with a live credential
    Authenticated,
    /// No session; browsing anonymously
    Guest,
    /// Process start, bootstrap not yet settled
    #[default]
    Idle,
}

/// Account flags fetched independently of the session itself.
///
/// The profile is allowed to lag behind authentication: it arrives from a
/// background fetch and may be absent for a while. Merging is
/// last-true-wins per flag, so a stale fetch never downgrades a flag that
/// was already observed true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub beta_access: bool,
    pub site_beta: bool,
}

impl Profile {
    /// Fold a freshly fetched profile into this one, last-true-wins.
    pub fn merge_from(&mut self, fetched: Profile) {
        self.beta_access |= fetched.beta_access;
        self.site_beta |= fetched.site_beta;
    }
}

/// Snapshot of the full session state.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Non-fatal diagnostic from the last settle, for display only
    pub error: Option<String>,
    /// Token expiry; `Some` exactly when `status` is `Authenticated`
    pub expires_at: Option<DateTime<Utc>>,
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    pub status: SessionStatus,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Cheaply cloneable handle to the shared session state.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.read().expires_at
    }

    /// Enter the authenticated state with a known identity (bootstrap,
    /// login, signup).
    pub fn sign_in(&self, principal: Principal, expires_at: DateTime<Utc>) {
        let mut state = self.write();
        state.error = None;
        state.expires_at = Some(expires_at);
        state.principal = Some(principal);
        state.status = SessionStatus::Authenticated;
        debug!(expires_at = %expires_at, "Session authenticated");
    }

    /// Move the expiry forward after a successful renewal. Identity and
    /// profile are untouched.
    pub fn set_authenticated(&self, expires_at: DateTime<Utc>) {
        let mut state = self.write();
        state.error = None;
        state.expires_at = Some(expires_at);
        state.status = SessionStatus::Authenticated;
    }

    /// Settle to guest: no session, and that is not an error.
    pub fn set_guest(&self) {
        let mut state = self.write();
        state.error = None;
        state.expires_at = None;
        state.principal = None;
        state.profile = None;
        state.status = SessionStatus::Guest;
        debug!("Session settled to guest");
    }

    /// Settle to guest after an unexpected failure, keeping a diagnostic.
    pub fn set_guest_with_error(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.error = Some(message.into());
        state.expires_at = None;
        state.principal = None;
        state.profile = None;
        state.status = SessionStatus::Guest;
    }

    /// Fold a fetched profile into the stored one (last-true-wins).
    pub fn merge_profile(&self, fetched: Profile) {
        let mut state = self.write();
        match &mut state.profile {
            Some(profile) => profile.merge_from(fetched),
            None => state.profile = Some(fetched),
        }
    }
}
