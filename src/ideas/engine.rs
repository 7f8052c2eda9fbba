//! Optimistic mutation engine for the idea collection.
//!
//! Every create, update, and delete lands in the local collection before the
//! remote call resolves, so the UI never waits on the network. Each
//! operation reconciles deterministically afterwards:
//!
//! - create: provisional record prepended under a placeholder id, swapped
//!   for the server row on success, removed on failure
//! - update: overwritten in place, replaced by the canonical row on success,
//!   restored from the pre-mutation snapshot on failure
//! - delete: soft-hidden via `pending`, removed on success, unhidden on
//!   failure
//!
//! Mutations on different ideas may be in flight concurrently. Mutations on
//! the *same* idea are not serialized: the last remote confirmation wins.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::ideas::model::{Idea, IdeaDraft, IdeaPatch};
use crate::session::refresh::RefreshScheduler;
use crate::session::store::SessionStore;

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("No idea with id {0}")]
    UnknownIdea(String),
    #[error("Nothing to update")]
    EmptyPatch,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Owns the ordered idea collection. The UI reads snapshots via
/// [`IdeaEngine::ideas`] and never mutates the collection directly.
pub struct IdeaEngine {
    gateway: Arc<dyn Gateway>,
    ideas: Mutex<Vec<Idea>>,
    scheduler: RefreshScheduler,
    session: SessionStore,
}

impl IdeaEngine {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        session: SessionStore,
        scheduler: RefreshScheduler,
    ) -> Self {
        Self {
            gateway,
            ideas: Mutex::new(Vec::new()),
            scheduler,
            session,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Idea>> {
        self.ideas.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the collection in display order.
    pub fn ideas(&self) -> Vec<Idea> {
        self.lock().clone()
    }

    /// Replace the collection with the server's listing, in server order.
    pub async fn load(&self) -> Result<usize, MutationError> {
        self.require_auth()?;

        let listed = match self.gateway.list_ideas().await {
            Ok(listed) => listed,
            Err(e) => return Err(self.fail(e)),
        };

        let count = listed.len();
        *self.lock() = listed;
        debug!(count, "Idea collection loaded");
        Ok(count)
    }

    /// Optimistic create: the provisional record is visible at the head of
    /// the collection immediately and holds its position when confirmed.
    pub async fn create(&self, draft: IdeaDraft) -> Result<Idea, MutationError> {
        self.require_auth()?;

        let owner = self
            .session
            .snapshot()
            .principal
            .map(|p| p.id)
            .unwrap_or_default();
        let provisional = Idea::provisional(&draft, &owner);
        let temp_id = provisional.id.clone();
        self.lock().insert(0, provisional);

        match self.gateway.create_idea(&draft).await {
            Ok(confirmed) => Ok(self.confirm_create(&temp_id, confirmed)),
            Err(e) => {
                // The record never existed remotely; rollback is removal
                self.lock().retain(|idea| idea.id != temp_id);
                Err(self.fail(e))
            }
        }
    }

    /// Optimistic update: the proposed values are visible immediately; the
    /// pre-mutation value is retained until the call resolves.
    pub async fn update(&self, id: &str, patch: IdeaPatch) -> Result<Idea, MutationError> {
        self.require_auth()?;
        if patch.is_empty() {
            return Err(MutationError::EmptyPatch);
        }

        let prior = {
            let mut ideas = self.lock();
            let position = ideas
                .iter()
                .position(|idea| idea.id == id)
                .ok_or_else(|| MutationError::UnknownIdea(id.to_string()))?;
            let prior = ideas[position].clone();
            patch.apply_to(&mut ideas[position]);
            ideas[position].pending = true;
            prior
        };

        match self.gateway.update_idea(id, &patch).await {
            Ok(mut canonical) => {
                canonical.pending = false;
                canonical.temp_id = None;
                self.put_back(id, canonical.clone());
                Ok(canonical)
            }
            Err(e) => {
                self.put_back(id, prior);
                Err(self.fail(e))
            }
        }
    }

    /// Optimistic delete: the record is soft-hidden (`pending`) until the
    /// remote call resolves, then removed or restored.
    pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
        self.require_auth()?;

        {
            let mut ideas = self.lock();
            let position = ideas
                .iter()
                .position(|idea| idea.id == id)
                .ok_or_else(|| MutationError::UnknownIdea(id.to_string()))?;
            ideas[position].pending = true;
        }

        match self.gateway.delete_idea(id).await {
            Ok(()) => {
                self.lock().retain(|idea| idea.id != id);
                Ok(())
            }
            Err(e) => {
                if let Some(idea) = self.lock().iter_mut().find(|idea| idea.id == id) {
                    idea.pending = false;
                }
                Err(self.fail(e))
            }
        }
    }

    /// Swap the provisional record for the server row, same position.
    fn confirm_create(&self, temp_id: &str, mut confirmed: Idea) -> Idea {
        confirmed.pending = false;
        confirmed.temp_id = None;

        let mut ideas = self.lock();
        match ideas
            .iter()
            .position(|idea| idea.temp_id.as_deref() == Some(temp_id))
        {
            Some(position) => ideas[position] = confirmed.clone(),
            // Should not occur under correct sequencing; fatal to this
            // reconciliation only
            None => warn!(temp_id, "No provisional record to confirm, dropping"),
        }
        confirmed
    }

    fn put_back(&self, id: &str, value: Idea) {
        let mut ideas = self.lock();
        match ideas.iter().position(|idea| idea.id == id) {
            Some(position) => ideas[position] = value,
            None => warn!(id, "Record vanished while its mutation was in flight"),
        }
    }

    fn require_auth(&self) -> Result<(), MutationError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(MutationError::NotAuthenticated)
        }
    }

    /// An unauthenticated response means the session itself is gone; every
    /// other failure leaves the session alone.
    fn fail(&self, error: GatewayError) -> MutationError {
        if error.is_auth_loss() {
            self.scheduler.drop_session();
        }
        MutationError::Gateway(error)
    }
}
