//! GitHub API client for app-authenticated operations.
//!
//! This module provides the [`GitHubClient`] for the app-scoped endpoints the
//! relay needs: listing installations, minting installation tokens, and
//! sending `repository_dispatch` events. Every call is a single attempt;
//! transient failures are reported as typed errors and the caller decides
//! whether to retry.

mod broker;
mod dispatch;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::{AppJwt, InstallationId, InstallationToken};
use crate::error::ApiError;

pub use broker::InstallationTokenBroker;

/// Media type GitHub expects on REST calls.
const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Configuration for GitHub API client behavior.
///
/// # Examples
///
/// ```
/// use github_app_client::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(10))
///     .with_user_agent("my-relay/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// GitHub API base URL
    pub github_api_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "push-relay/0.1.0".to_string(),
            timeout: Duration::from_secs(30),
            github_api_url: "https://api.github.com".to_string(),
        }
    }
}

impl ClientConfig {
    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }
}

/// Account an installation belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Organization or user login.
    pub login: String,
}

/// A GitHub App installation as returned by `GET /app/installations`.
#[derive(Debug, Clone, Deserialize)]
pub struct Installation {
    /// Installation identifier.
    pub id: InstallationId,
    /// The account the app is installed on.
    pub account: Account,
}

/// Wire shape of `POST /app/installations/{id}/access_tokens`.
#[derive(Debug, Deserialize)]
struct InstallationTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

/// HTTP client for the GitHub REST API.
///
/// Holds no credentials of its own: each call takes the JWT or installation
/// token it should authenticate with, so token lifecycle stays with the
/// caller.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl GitHubClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidConfiguration`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::InvalidConfiguration {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the HTTP client (internal use by the dispatch operations).
    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// List all installations of the authenticated GitHub App.
    ///
    /// # Authentication
    ///
    /// Requires an app JWT.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::TokenRejected`] if GitHub rejects the JWT (401)
    /// and [`ApiError::UpstreamStatus`] for other non-success statuses.
    pub async fn list_installations(&self, jwt: &AppJwt) -> Result<Vec<Installation>, ApiError> {
        let url = format!("{}/app/installations", self.config.github_api_url);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", jwt.token()))
            .header("Accept", GITHUB_ACCEPT)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ApiError::TokenRejected);
            }
            return Err(upstream_status_error(response).await);
        }

        Ok(response.json::<Vec<Installation>>().await?)
    }

    /// Exchange an app JWT for an installation access token.
    ///
    /// # Authentication
    ///
    /// Requires an app JWT.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InstallationGone`] when the installation no longer
    /// exists (404), [`ApiError::TokenRejected`] if GitHub rejects the JWT
    /// (401), and [`ApiError::UpstreamStatus`] for other non-success
    /// statuses.
    pub async fn create_installation_token(
        &self,
        installation_id: InstallationId,
        jwt: &AppJwt,
    ) -> Result<InstallationToken, ApiError> {
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.config.github_api_url,
            installation_id.as_u64()
        );

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", jwt.token()))
            .header("Accept", GITHUB_ACCEPT)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                reqwest::StatusCode::NOT_FOUND => ApiError::InstallationGone { installation_id },
                reqwest::StatusCode::UNAUTHORIZED => ApiError::TokenRejected,
                _ => upstream_status_error(response).await,
            });
        }

        let body = response.json::<InstallationTokenResponse>().await?;
        Ok(InstallationToken::new(
            body.token,
            installation_id,
            body.expires_at,
        ))
    }
}

/// Map a reqwest send error to its typed equivalent.
fn classify_transport(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(error)
    }
}

/// Turn a non-success response into an [`ApiError::UpstreamStatus`].
async fn upstream_status_error(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());

    ApiError::UpstreamStatus { status, message }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
