//! Remote gateway — the authenticated HTTP boundary to the Ideaboard backend.
//!
//! Everything above this module works against the [`Gateway`] trait; the
//! reqwest-backed [`HttpGateway`] is the production implementation. Tests
//! substitute a scripted mock.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ideas::model::{Idea, IdeaDraft, IdeaPatch};
use crate::session::store::Profile;

/// Error type for gateway operations.
///
/// Callers discriminate [`GatewayError::Unauthenticated`] (the session is
/// gone and must be dropped locally) from everything else (the session
/// stays, only the operation failed).
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Rate limited, try again later")]
    RateLimited,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl GatewayError {
    /// True when the failure means the session itself is no longer valid.
    pub fn is_auth_loss(&self) -> bool {
        matches!(self, GatewayError::Unauthenticated)
    }
}

/// Identity attached to a live session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub id: String,
}

/// A live session found by the session check. The backend nests the
/// bearer credential inside the user object.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionCheck {
    pub user: SessionUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionUser {
    pub email: String,
    pub id: String,
    /// Bearer credential whose expiry claim the client decodes
    pub token: String,
}

impl SessionCheck {
    pub fn principal(&self) -> Principal {
        Principal {
            email: self.user.email.clone(),
            id: self.user.id.clone(),
        }
    }
}

/// Result of a successful login or signup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// Token expiry, sent by the backend as epoch milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub user: Principal,
}

/// Result of a successful silent renewal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedSession {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

/// Operations the backend exposes to this client core.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Returns the current identity if a valid session credential exists,
    /// `None` if there is simply no session.
    async fn check_session(&self) -> Result<Option<SessionCheck>, GatewayError>;

    /// Renew the session using the out-of-band refresh credential.
    async fn refresh_session(&self) -> Result<RefreshedSession, GatewayError>;

    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError>;

    async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError>;

    async fn logout(&self) -> Result<(), GatewayError>;

    async fn fetch_profile(&self) -> Result<Profile, GatewayError>;

    async fn list_ideas(&self) -> Result<Vec<Idea>, GatewayError>;

    async fn create_idea(&self, draft: &IdeaDraft) -> Result<Idea, GatewayError>;

    async fn update_idea(&self, id: &str, patch: &IdeaPatch) -> Result<Idea, GatewayError>;

    async fn delete_idea(&self, id: &str) -> Result<(), GatewayError>;
}
