//! Push-event wire types.
//!
//! Typed view of the webhook producer's push payload: the commit list with
//! per-commit file path changes, the head commit, and the source repository.
//! Only the fields the relay consults are modeled; unknown payload fields are
//! ignored during deserialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Error raised when a request body cannot be read as a push event.
#[derive(Debug, Error)]
pub enum EventParseError {
    /// Body was not valid JSON or did not match the push-event schema.
    #[error("invalid push payload: {message}")]
    InvalidPayload {
        /// Parser diagnostic; carries positions and field names, never the body
        message: String,
    },
}

// ============================================================================
// Push Events
// ============================================================================

/// Push event with commit information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Git ref that was pushed (e.g., "refs/heads/main")
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// Commit SHA before the push
    pub before: String,

    /// Commit SHA after the push
    pub after: String,

    /// Commits included in the push
    #[serde(default)]
    pub commits: Vec<Commit>,

    /// The most recent commit; absent when the push deleted the ref
    pub head_commit: Option<Commit>,

    /// Repository the push was made against
    pub repository: Repository,

    /// Identity that performed the push
    pub pusher: Pusher,
}

impl PushEvent {
    /// Parses a raw webhook body as a push event.
    pub fn from_body(body: &[u8]) -> Result<Self, EventParseError> {
        serde_json::from_slice(body).map_err(|e| EventParseError::InvalidPayload {
            message: e.to_string(),
        })
    }

    /// Branch name with the `refs/heads/` prefix stripped.
    ///
    /// Non-branch refs (tags, etc.) are returned unchanged.
    pub fn branch(&self) -> &str {
        self.ref_name
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.ref_name)
    }

    /// Union of added and modified paths across all commits in the push.
    ///
    /// Removed paths are excluded: deleting a tracked file is not a change
    /// the downstream pipeline acts on.
    pub fn touched_paths(&self) -> impl Iterator<Item = &str> {
        self.commits.iter().flat_map(|commit| commit.touched_paths())
    }
}

/// Commit information from a push event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit SHA
    pub id: String,

    /// Commit message
    pub message: String,

    /// Commit author
    pub author: CommitAuthor,

    /// Paths added by this commit
    #[serde(default)]
    pub added: Vec<String>,

    /// Paths modified by this commit
    #[serde(default)]
    pub modified: Vec<String>,

    /// Paths removed by this commit
    #[serde(default)]
    pub removed: Vec<String>,
}

impl Commit {
    /// Paths added or modified by this commit.
    pub fn touched_paths(&self) -> impl Iterator<Item = &str> {
        self.added
            .iter()
            .chain(self.modified.iter())
            .map(String::as_str)
    }
}

/// Author information in a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    /// Name
    pub name: String,

    /// Email address
    pub email: String,

    /// Username on the hosting platform (if available)
    pub username: Option<String>,
}

/// Repository information carried on a push event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// Short repository name
    pub name: String,

    /// Full "owner/name" identifier
    pub full_name: String,
}

/// Identity that performed the push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pusher {
    /// Username or git identity name
    pub name: String,

    /// Email address (may be absent)
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
