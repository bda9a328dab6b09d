//! Two-hop exchange of app credentials for installation tokens.
//!
//! GitHub Apps cannot call repository endpoints with an app JWT. The broker
//! performs the required exchange: mint a JWT, resolve the installation that
//! covers the target organization, then trade the JWT for an installation
//! token scoped to that installation.

use std::sync::Arc;

use tracing::debug;

use super::GitHubClient;
use crate::auth::{InstallationToken, JwtMinter, TokenCache};
use crate::error::{ApiError, AuthError};

/// Resolves installation tokens for organizations.
///
/// An optional [`TokenCache`] short-circuits both API hops when a fresh
/// token is already held for the organization. The cache is never
/// load-bearing: a miss or an absent cache just means the full exchange
/// runs again.
#[derive(Clone)]
pub struct InstallationTokenBroker {
    client: Arc<GitHubClient>,
    minter: JwtMinter,
    cache: Option<Arc<dyn TokenCache>>,
}

impl InstallationTokenBroker {
    /// Create a broker without caching.
    pub fn new(client: Arc<GitHubClient>, minter: JwtMinter) -> Self {
        Self {
            client,
            minter,
            cache: None,
        }
    }

    /// Attach a token cache.
    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Obtain an installation token for the installation covering `org`.
    ///
    /// Organization login matching is case-insensitive, mirroring how GitHub
    /// treats logins.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AppNotInstalled`] (wrapped in
    /// [`AuthError::Api`]) when no installation's account matches `org`,
    /// plus any minting or API failure from the two hops. None of the hops
    /// are retried here.
    pub async fn installation_token_for(
        &self,
        org: &str,
    ) -> Result<InstallationToken, AuthError> {
        if let Some(cache) = &self.cache {
            if let Some(token) = cache.get(org).await {
                debug!(org = %org, "installation token served from cache");
                return Ok(token);
            }
        }

        let jwt = self.minter.mint()?;

        let installations = self.client.list_installations(&jwt).await?;
        let installation = installations
            .iter()
            .find(|installation| installation.account.login.eq_ignore_ascii_case(org))
            .ok_or_else(|| {
                ApiError::AppNotInstalled {
                    org: org.to_string(),
                }
            })?;

        debug!(
            org = %org,
            installation_id = %installation.id,
            "resolved installation, exchanging for access token"
        );

        let token = self
            .client
            .create_installation_token(installation.id, &jwt)
            .await?;

        if let Some(cache) = &self.cache {
            cache.store(org, token.clone()).await;
        }

        Ok(token)
    }

    /// Drop any cached token for `org`.
    ///
    /// Called when GitHub rejects a token mid-use so the next exchange
    /// starts clean.
    pub async fn invalidate(&self, org: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(org).await;
        }
    }
}

impl std::fmt::Debug for InstallationTokenBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationTokenBroker")
            .field("client", &self.client)
            .field("minter", &self.minter)
            .field("cache_enabled", &self.cache.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
