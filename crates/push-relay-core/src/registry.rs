//! Collaborator-store reads.
//!
//! The registry is an external allow-list of repositories the relay acts on.
//! It is consumed read-only through [`RegistryStore`]; the HTTP-backed
//! implementation talks to a small JSON API
//! (`GET {base_url}/repositories?full_name={name}` with a bearer credential).
//!
//! Registry failures are never fatal to a webhook request: the event filter
//! treats any lookup error as "not relevant" (fail closed).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors from collaborator-store reads.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Store configuration was unusable (bad URL, client build failure).
    #[error("invalid registry configuration: {message}")]
    Configuration {
        /// What was wrong
        message: String,
    },

    /// Store answered with a non-success status.
    #[error("registry returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// Request failed in transit (connect, timeout, body decode).
    #[error("registry request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

// ============================================================================
// Registry Entries
// ============================================================================

/// Registration status of a repository in the collaborator store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryStatus {
    /// Repository is registered and pushes to it are acted on.
    Active,
    /// Repository is registered but switched off; pushes are ignored.
    Disabled,
}

/// A repository entry in the collaborator registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Full "owner/name" repository identifier
    pub full_name: String,

    /// Registration status
    pub status: RegistryStatus,
}

impl RegistryEntry {
    /// Whether pushes to this repository should be acted on.
    pub fn is_active(&self) -> bool {
        self.status == RegistryStatus::Active
    }
}

// ============================================================================
// Registry Store
// ============================================================================

/// Read-only lookup against the repository allow-list.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Looks up a repository by its full "owner/name" identifier.
    ///
    /// `Ok(None)` means the repository is not registered, which is a normal
    /// outcome rather than an error.
    async fn lookup(&self, full_name: &str) -> Result<Option<RegistryEntry>, RegistryError>;
}

/// Configuration for the HTTP-backed registry store.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the registry API
    pub base_url: String,

    /// Bearer credential for registry reads
    pub credential: String,

    /// Request timeout
    pub timeout: Duration,

    /// User agent header value
    pub user_agent: String,
}

impl RegistryConfig {
    /// Creates a configuration with the default timeout and user agent.
    pub fn new(base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: credential.into(),
            timeout: Duration::from_secs(10),
            user_agent: "push-relay/0.1.0".to_string(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP client for the collaborator store.
pub struct HttpRegistryStore {
    http_client: reqwest::Client,
    base_url: String,
    credential: String,
}

impl HttpRegistryStore {
    /// Creates a store client from the given configuration.
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| RegistryError::Configuration {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credential: config.credential,
        })
    }
}

impl std::fmt::Debug for HttpRegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRegistryStore")
            .field("base_url", &self.base_url)
            .field("credential", &"<REDACTED>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RegistryStore for HttpRegistryStore {
    async fn lookup(&self, full_name: &str) -> Result<Option<RegistryEntry>, RegistryError> {
        let url = format!("{}/repositories", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .query(&[("full_name", full_name)])
            .header("Authorization", format!("Bearer {}", self.credential))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RegistryError::Status {
                status: response.status().as_u16(),
            });
        }

        let entries: Vec<RegistryEntry> = response.json().await?;

        Ok(entries
            .into_iter()
            .find(|entry| entry.full_name.eq_ignore_ascii_case(full_name)))
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
