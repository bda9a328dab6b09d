//! Delivery processing pipeline.
//!
//! One [`RelayPipeline::handle`] call takes a webhook delivery through five
//! stages in a fixed order: signature verification, event-type gating,
//! payload parsing, relevance filtering, and the credential exchange plus
//! downstream dispatch. The order is load-bearing: nothing interprets the
//! payload before the signature proves its origin, and no credential is
//! minted for a push that will not be relayed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use github_app_client::{
    ApiError, AppCredentials, AppId, ClientConfig, GitHubClient, InMemoryTokenCache,
    InstallationTokenBroker, JwtMinter, PrivateKeyPem, SignatureVerifier, WebhookSecret,
};
use push_relay_core::{
    DispatchPayload, EventFilter, HttpRegistryStore, PushEvent, RegistryConfig, Relevance,
    TrackedPattern,
};

use crate::config::{ConfigError, RelayConfig};
use crate::RelayError;

/// What handling one delivery produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The push was relayed downstream.
    Dispatched {
        /// Source repository the push came from
        repository: String,
        /// Head commit carried in the dispatch
        commit_sha: String,
    },

    /// The delivery was understood and deliberately skipped.
    Ignored {
        /// Machine-readable reason, safe to echo to the producer
        reason: String,
    },
}

/// The webhook processing pipeline.
///
/// Built once at startup and shared across requests; every stage is either
/// stateless or internally synchronized.
pub struct RelayPipeline {
    verifier: SignatureVerifier,
    filter: EventFilter,
    broker: InstallationTokenBroker,
    client: Arc<GitHubClient>,
    organization: String,
    dispatch_repository: String,
    dispatch_event_type: String,
}

impl RelayPipeline {
    /// Build the pipeline from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when an HTTP client cannot be
    /// constructed or the tracked-file pattern does not compile, and
    /// [`ConfigError::Missing`] when no private key source is configured.
    pub fn from_config(config: &RelayConfig) -> Result<Self, ConfigError> {
        let verifier = SignatureVerifier::new(WebhookSecret::new(config.webhook.secret.clone()));

        let pattern = TrackedPattern::new(&config.filter.tracked_pattern).map_err(|e| {
            ConfigError::Invalid {
                message: e.to_string(),
            }
        })?;
        let registry_config = RegistryConfig::new(
            config.registry.base_url.clone(),
            config.registry.credential.clone(),
        )
        .with_timeout(Duration::from_secs(config.registry.timeout_seconds));
        let registry = HttpRegistryStore::new(registry_config).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        let filter = EventFilter::new(pattern, Arc::new(registry));

        let private_key = config.github.resolved_private_key()?;
        let credentials = AppCredentials::new(
            AppId::new(config.github.app_id),
            PrivateKeyPem::new(private_key),
        );
        let minter = JwtMinter::new(credentials);

        let client_config = ClientConfig::default()
            .with_github_api_url(config.github.api_url.clone())
            .with_timeout(Duration::from_secs(config.github.timeout_seconds));
        let client = Arc::new(
            GitHubClient::new(client_config).map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?,
        );

        let mut broker = InstallationTokenBroker::new(Arc::clone(&client), minter);
        if config.github.cache_tokens {
            broker = broker.with_cache(Arc::new(InMemoryTokenCache::new()));
        }

        Ok(Self {
            verifier,
            filter,
            broker,
            client,
            organization: config.github.organization.clone(),
            dispatch_repository: config.dispatch.repository.clone(),
            dispatch_event_type: config.dispatch.event_type.clone(),
        })
    }

    /// Process one webhook delivery.
    ///
    /// `event_type` and `signature` are the values of the `X-GitHub-Event`
    /// and `X-Hub-Signature-256` headers; `body` is the raw request body,
    /// byte-for-byte as received.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] when the signature check fails
    /// and [`RelayError::Auth`] or [`RelayError::Api`] when a relevant push
    /// cannot be relayed. Everything else is an [`PipelineOutcome::Ignored`]
    /// success.
    #[instrument(
        skip(self, signature, body),
        fields(event_type = event_type.unwrap_or("<missing>"))
    )]
    pub async fn handle(
        &self,
        event_type: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<PipelineOutcome, RelayError> {
        // Nothing below this check may interpret the payload.
        let signature = signature.ok_or(RelayError::Unauthorized)?;
        match self.verifier.verify(body, signature) {
            Ok(true) => {}
            Ok(false) => return Err(RelayError::Unauthorized),
            Err(e) => {
                warn!(error = %e, "webhook signature header unusable");
                return Err(RelayError::Unauthorized);
            }
        }

        match event_type {
            Some("push") => {}
            Some("ping") => {
                info!("ping acknowledged");
                return Ok(PipelineOutcome::Ignored {
                    reason: "ping acknowledged".to_string(),
                });
            }
            _ => {
                return Ok(PipelineOutcome::Ignored {
                    reason: "not a push event".to_string(),
                });
            }
        }

        let event = match PushEvent::from_body(body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "push payload failed to parse");
                return Ok(PipelineOutcome::Ignored {
                    reason: "malformed push payload".to_string(),
                });
            }
        };

        let matched_path = match self.filter.evaluate(&event).await {
            Relevance::Relevant { matched_path } => matched_path,
            Relevance::Ignored { reason } => {
                info!(
                    repository = %event.repository.full_name,
                    branch = %event.branch(),
                    reason = %reason,
                    "push not relayed"
                );
                return Ok(PipelineOutcome::Ignored {
                    reason: reason.to_string(),
                });
            }
        };

        let payload =
            match DispatchPayload::from_push(&self.dispatch_event_type, &event, &matched_path) {
                Some(payload) => payload,
                None => {
                    warn!(
                        repository = %event.repository.full_name,
                        "push matched the tracked pattern but carries no head commit"
                    );
                    return Ok(PipelineOutcome::Ignored {
                        reason: "push carries no head commit".to_string(),
                    });
                }
            };

        let token = self
            .broker
            .installation_token_for(&self.organization)
            .await?;

        let client_payload =
            serde_json::to_value(&payload.client_payload).map_err(|e| RelayError::Internal {
                message: format!("dispatch payload serialization failed: {}", e),
            })?;

        if let Err(error) = self
            .client
            .repository_dispatch(
                &token,
                &self.dispatch_repository,
                &payload.event_type,
                &client_payload,
            )
            .await
        {
            if matches!(error, ApiError::TokenRejected) {
                // The cached token went stale mid-flight; drop it so the
                // next delivery re-mints instead of failing the same way.
                self.broker.invalidate(&self.organization).await;
            }
            return Err(error.into());
        }

        info!(
            repository = %event.repository.full_name,
            commit_sha = %payload.client_payload.commit_sha,
            matched_path = %matched_path,
            target = %self.dispatch_repository,
            "push relayed downstream"
        );

        Ok(PipelineOutcome::Dispatched {
            repository: event.repository.full_name.clone(),
            commit_sha: payload.client_payload.commit_sha.clone(),
        })
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
