//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::gateway::{
    AuthSession, Gateway, GatewayError, Principal, RefreshedSession, SessionCheck, SessionUser,
};
use crate::ideas::model::{Idea, IdeaDraft, IdeaPatch, IdeaStatus};
use crate::session::store::Profile;

pub fn make_principal(id: &str) -> Principal {
    Principal {
        email: format!("{id}@example.com"),
        id: id.to_string(),
    }
}

/// Build an unsigned JWT whose payload carries only the given expiry.
/// Claim decoding never verifies signatures, so `sig` is a placeholder.
pub fn make_jwt(expires_at: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\",\"typ\":\"JWT\"}");
    let payload =
        URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{}}}", expires_at.timestamp()).as_bytes());
    format!("{header}.{payload}.sig")
}

pub fn make_session_check(user_id: &str, expires_at: DateTime<Utc>) -> SessionCheck {
    SessionCheck {
        user: SessionUser {
            email: format!("{user_id}@example.com"),
            id: user_id.to_string(),
            token: make_jwt(expires_at),
        },
    }
}

pub fn make_idea(id: &str, title: &str) -> Idea {
    let now = Utc::now();
    Idea {
        created_at: now,
        description: String::new(),
        id: id.to_string(),
        pending: false,
        status: IdeaStatus::Draft,
        tags: Vec::new(),
        temp_id: None,
        title: title.to_string(),
        updated_at: now,
        user_id: "u1".to_string(),
        vote_count: 0,
    }
}

/// Scripted [`Gateway`] double.
///
/// Responses are pushed per operation and consumed in order; an exhausted
/// queue falls back to the operation's quiet default (no session, no
/// renewable credential, empty listing). Mutation queues have no default —
/// an unscripted mutation is a test bug and panics.
#[derive(Default)]
pub struct MockGateway {
    check_calls: AtomicUsize,
    checks: Mutex<VecDeque<Result<Option<SessionCheck>, GatewayError>>>,
    creates: Mutex<VecDeque<Result<Idea, GatewayError>>>,
    deletes: Mutex<VecDeque<Result<(), GatewayError>>>,
    last_created_status: Mutex<Option<IdeaStatus>>,
    lists: Mutex<VecDeque<Vec<Idea>>>,
    logins: Mutex<VecDeque<Result<AuthSession, GatewayError>>>,
    profiles: Mutex<VecDeque<Result<Profile, GatewayError>>>,
    refresh_calls: AtomicUsize,
    refreshes: Mutex<VecDeque<Result<RefreshedSession, GatewayError>>>,
    updates: Mutex<VecDeque<Result<Idea, GatewayError>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_check(&self, response: Result<Option<SessionCheck>, GatewayError>) {
        self.checks.lock().unwrap().push_back(response);
    }

    pub fn push_refresh(&self, response: Result<RefreshedSession, GatewayError>) {
        self.refreshes.lock().unwrap().push_back(response);
    }

    pub fn push_login(&self, response: Result<AuthSession, GatewayError>) {
        self.logins.lock().unwrap().push_back(response);
    }

    pub fn push_profile(&self, response: Result<Profile, GatewayError>) {
        self.profiles.lock().unwrap().push_back(response);
    }

    pub fn push_list(&self, ideas: Vec<Idea>) {
        self.lists.lock().unwrap().push_back(ideas);
    }

    pub fn push_create(&self, response: Result<Idea, GatewayError>) {
        self.creates.lock().unwrap().push_back(response);
    }

    pub fn push_update(&self, response: Result<Idea, GatewayError>) {
        self.updates.lock().unwrap().push_back(response);
    }

    pub fn push_delete(&self, response: Result<(), GatewayError>) {
        self.deletes.lock().unwrap().push_back(response);
    }

    pub fn check_calls(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn last_created_status(&self) -> Option<IdeaStatus> {
        *self.last_created_status.lock().unwrap()
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn check_session(&self) -> Result<Option<SessionCheck>, GatewayError> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        self.checks
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn refresh_session(&self) -> Result<RefreshedSession, GatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GatewayError::Unauthenticated))
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<AuthSession, GatewayError> {
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted login")
    }

    async fn signup(&self, email: &str, password: &str) -> Result<AuthSession, GatewayError> {
        self.login(email, password).await
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<Profile, GatewayError> {
        self.profiles
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Profile::default()))
    }

    async fn list_ideas(&self) -> Result<Vec<Idea>, GatewayError> {
        Ok(self.lists.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn create_idea(&self, draft: &IdeaDraft) -> Result<Idea, GatewayError> {
        *self.last_created_status.lock().unwrap() = Some(draft.status);
        self.creates
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted create_idea")
    }

    async fn update_idea(&self, _id: &str, _patch: &IdeaPatch) -> Result<Idea, GatewayError> {
        self.updates
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted update_idea")
    }

    async fn delete_idea(&self, _id: &str) -> Result<(), GatewayError> {
        self.deletes
            .lock()
            .unwrap()
            .pop_front()
            .expect("unscripted delete_idea")
    }
}
