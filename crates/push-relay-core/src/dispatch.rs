//! Dispatch payload construction.
//!
//! Builds the `repository_dispatch` body for a relevant push: the event type
//! the downstream workflow subscribes to plus a structured description of the
//! source change. Delivery itself is the API client's job.

use serde::{Deserialize, Serialize};

use crate::events::PushEvent;

// ============================================================================
// Dispatch Payload
// ============================================================================

/// Body of a downstream `repository_dispatch` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    /// Event type the downstream workflow subscribes to
    pub event_type: String,

    /// Structured description of the source change
    pub client_payload: ClientPayload,
}

/// Description of the source change, as read by the downstream workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPayload {
    /// Full "owner/name" of the repository that was pushed
    pub repository: String,

    /// Head commit SHA, carried verbatim
    pub commit_sha: String,

    /// Head commit message
    pub commit_message: String,

    /// Head commit author name
    pub commit_author: String,

    /// Branch the push landed on
    pub branch: String,

    /// Directory holding the matched manifest; omitted at the repository root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_path: Option<String>,
}

impl DispatchPayload {
    /// Builds the downstream payload for a relevant push.
    ///
    /// Returns `None` when the event carries no head commit. Zero-commit
    /// pushes never pass the filter, so this only guards against payloads
    /// malformed at the source.
    pub fn from_push(event_type: &str, event: &PushEvent, matched_path: &str) -> Option<Self> {
        let head = event.head_commit.as_ref()?;

        Some(Self {
            event_type: event_type.to_string(),
            client_payload: ClientPayload {
                repository: event.repository.full_name.clone(),
                commit_sha: head.id.clone(),
                commit_message: head.message.clone(),
                commit_author: head.author.name.clone(),
                branch: event.branch().to_string(),
                package_path: package_path_of(matched_path),
            },
        })
    }
}

/// Parent directory of a matched manifest path.
///
/// `packages/widget/package.json` → `packages/widget`; a manifest at the
/// repository root has no package path.
fn package_path_of(matched_path: &str) -> Option<String> {
    matched_path
        .rsplit_once('/')
        .map(|(dir, _file)| dir.to_string())
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
