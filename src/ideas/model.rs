use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdeaStatus {
    Archived,
    #[default]
    Draft,
    Published,
}

/// A user idea as stored remotely, plus transient reconciliation state.
///
/// The `pending` flag and `temp_id` exist only on this side of the wire:
/// they mark a record whose latest mutation has not been confirmed yet and
/// are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub created_at: DateTime<Utc>,
    pub description: String,
    /// Server-assigned UUID, or the placeholder id while a create is
    /// unconfirmed
    pub id: String,
    /// True while a mutation on this record awaits remote confirmation
    #[serde(skip)]
    pub pending: bool,
    pub status: IdeaStatus,
    pub tags: Vec<String>,
    /// Present only for an unconfirmed create; equal to `id` until the
    /// server identity replaces both
    #[serde(skip)]
    pub temp_id: Option<String>,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    /// Owner reference
    pub user_id: String,
    /// Derived counter, maintained server-side
    #[serde(default)]
    pub vote_count: u32,
}

impl Idea {
    /// Build the provisional record for an optimistic create, keyed by a
    /// freshly generated placeholder identity.
    ///
    /// `user_id` may be blank when the local identity is not known (a
    /// session restored via silent renewal carries no principal); the
    /// server row brings the real owner when the create is confirmed.
    pub fn provisional(draft: &IdeaDraft, user_id: &str) -> Self {
        let now = Utc::now();
        let temp_id = format!("temp-{}", Uuid::new_v4());
        Self {
            created_at: now,
            description: draft.description.clone(),
            id: temp_id.clone(),
            pending: true,
            status: draft.status,
            tags: draft.tags.clone(),
            temp_id: Some(temp_id),
            title: draft.title.clone(),
            updated_at: now,
            user_id: user_id.to_string(),
            vote_count: 0,
        }
    }
}

/// Fields the caller supplies when creating an idea.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdeaDraft {
    pub description: String,
    pub status: IdeaStatus,
    pub tags: Vec<String>,
    pub title: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IdeaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IdeaStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl IdeaPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.status.is_none()
            && self.tags.is_none()
            && self.title.is_none()
    }

    /// Overlay the provided fields onto an existing record.
    pub fn apply_to(&self, idea: &mut Idea) {
        if let Some(description) = &self.description {
            idea.description = description.clone();
        }
        if let Some(status) = self.status {
            idea.status = status;
        }
        if let Some(tags) = &self.tags {
            idea.tags = tags.clone();
        }
        if let Some(title) = &self.title {
            idea.title = title.clone();
        }
        idea.updated_at = Utc::now();
    }
}
