//! Repository dispatch operations.
//!
//! `repository_dispatch` is the delivery half of the relay: a POST to
//! `/repos/{owner}/{repo}/dispatches` carrying an event type and an
//! arbitrary JSON payload, authenticated with an installation token.

use serde::Serialize;

use super::{classify_transport, upstream_status_error, GitHubClient, GITHUB_ACCEPT};
use crate::auth::InstallationToken;
use crate::error::ApiError;

/// Wire shape of the dispatch request body.
#[derive(Debug, Serialize)]
struct RepositoryDispatchRequest<'a> {
    event_type: &'a str,
    client_payload: &'a serde_json::Value,
}

impl GitHubClient {
    /// Send a `repository_dispatch` event to `repository` (an `owner/name`
    /// pair).
    ///
    /// GitHub answers 204 with no body on success.
    ///
    /// # Authentication
    ///
    /// Requires an installation token whose installation covers the target
    /// repository.
    ///
    /// # Errors
    ///
    /// - [`ApiError::RepositoryNotCovered`] when the token's installation
    ///   does not grant access to the repository (403)
    /// - [`ApiError::DispatchTargetNotFound`] when the repository does not
    ///   exist or the app cannot see it (404)
    /// - [`ApiError::TokenRejected`] when the token has expired or been
    ///   revoked (401)
    /// - [`ApiError::UpstreamStatus`] for other non-success statuses
    pub async fn repository_dispatch(
        &self,
        token: &InstallationToken,
        repository: &str,
        event_type: &str,
        client_payload: &serde_json::Value,
    ) -> Result<(), ApiError> {
        let url = format!(
            "{}/repos/{}/dispatches",
            self.config.github_api_url, repository
        );
        let body = RepositoryDispatchRequest {
            event_type,
            client_payload,
        };

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token.token()))
            .header("Accept", GITHUB_ACCEPT)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                reqwest::StatusCode::FORBIDDEN => ApiError::RepositoryNotCovered {
                    repository: repository.to_string(),
                },
                reqwest::StatusCode::NOT_FOUND => ApiError::DispatchTargetNotFound {
                    repository: repository.to_string(),
                },
                reqwest::StatusCode::UNAUTHORIZED => ApiError::TokenRejected,
                _ => upstream_status_error(response).await,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
