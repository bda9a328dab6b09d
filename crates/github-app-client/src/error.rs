//! Error types for GitHub App client operations.
//!
//! This module defines all error types used throughout the crate, with
//! classification for transient-vs-terminal handling and stable category
//! names for HTTP error bodies. Category strings never carry credential
//! material; callers may embed them in responses verbatim.

use thiserror::Error;

use crate::auth::InstallationId;

/// Authentication-related errors covering key import, JWT minting, and the
/// installation token exchange.
///
/// Key import failures get two distinct variants because they need different
/// operator action: `UnsupportedKeyFormat` means "convert the key",
/// `InvalidKeyContent` means "the key material itself is broken".
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key is framed in a format the signer does not accept
    /// (PKCS#1 instead of PKCS#8). Non-retryable; the message carries the
    /// conversion command.
    #[error("Unsupported private key format: {message}")]
    UnsupportedKeyFormat { message: String },

    /// The private key claims a supported framing but fails to parse.
    /// Non-retryable.
    #[error("Invalid private key: {message}")]
    InvalidKeyContent { message: String },

    /// Serializing the JWT claims failed. Non-retryable.
    #[error("JWT claims encoding failed: {message}")]
    ClaimsEncoding { message: String },

    /// The RSA signing operation itself failed. Non-retryable.
    #[error("JWT signing failed: {message}")]
    SigningFailed { message: String },

    /// GitHub API interaction failed during the token exchange.
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl AuthError {
    /// Check if this error represents a transient condition that may succeed
    /// if the producer redelivers the webhook.
    ///
    /// Key and signing failures are configuration problems and never
    /// transient; API errors delegate to [`ApiError::is_transient`].
    pub fn is_transient(&self) -> bool {
        match self {
            Self::UnsupportedKeyFormat { .. } => false,
            Self::InvalidKeyContent { .. } => false,
            Self::ClaimsEncoding { .. } => false,
            Self::SigningFailed { .. } => false,
            Self::Api(e) => e.is_transient(),
        }
    }

    /// Stable kebab-case category for HTTP error bodies and log fields.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::UnsupportedKeyFormat { .. } | Self::InvalidKeyContent { .. } => {
                "key-import-failure"
            }
            Self::ClaimsEncoding { .. } | Self::SigningFailed { .. } => "jwt-minting-failure",
            Self::Api(e) => e.error_category(),
        }
    }
}

/// Errors from GitHub API calls: installation discovery, token minting, and
/// repository dispatch.
///
/// The 4xx space is deliberately split into precise variants so callers can
/// branch on the exact failure ("reinstall the App" vs "grant the App access
/// to this repository" vs "rotate the credential") without string matching.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No installation of the App matched the target organization.
    /// Requires operator action; never retried.
    #[error("App not installed on organization '{org}'")]
    AppNotInstalled { org: String },

    /// The installation existed at discovery time but the token mint
    /// returned 404: it was removed, or covers no repositories.
    #[error("Installation {installation_id} no longer exists or covers no repositories")]
    InstallationGone { installation_id: InstallationId },

    /// Dispatch returned 403: the installation's repository-access grant
    /// does not cover the target repository. An authorization-scope problem,
    /// distinct from a rejected credential.
    #[error("Installation does not cover repository '{repository}'")]
    RepositoryNotCovered { repository: String },

    /// Dispatch returned 404: the target repository or endpoint is unknown.
    #[error("Dispatch target '{repository}' not found")]
    DispatchTargetNotFound { repository: String },

    /// The bearer credential was rejected (401).
    #[error("Credential rejected by GitHub API")]
    TokenRejected,

    /// Any other non-2xx response. Transient when the status is a server
    /// error.
    #[error("GitHub API error: {status} - {message}")]
    UpstreamStatus { status: u16, message: String },

    /// Request to the GitHub API timed out.
    #[error("Request timeout")]
    Timeout,

    /// HTTP client error (connect, TLS, body decode).
    #[error("HTTP client error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The client configuration is unusable (bad base URL, client build
    /// failure).
    #[error("Invalid client configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl ApiError {
    /// Check if this error represents a transient condition.
    ///
    /// 4xx responses are configuration errors and never transient; server
    /// errors, timeouts, and transport failures are.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AppNotInstalled { .. } => false,
            Self::InstallationGone { .. } => false,
            Self::RepositoryNotCovered { .. } => false,
            Self::DispatchTargetNotFound { .. } => false,
            Self::TokenRejected => false,
            Self::UpstreamStatus { status, .. } => *status >= 500,
            Self::Timeout => true,
            Self::Transport(_) => true,
            Self::InvalidConfiguration { .. } => false,
        }
    }

    /// Stable kebab-case category for HTTP error bodies and log fields.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::AppNotInstalled { .. } => "app-not-installed",
            Self::InstallationGone { .. } => "installation-not-found",
            Self::RepositoryNotCovered { .. } => "repository-not-covered-by-installation",
            Self::DispatchTargetNotFound { .. } => "dispatch-target-not-found",
            Self::TokenRejected => "invalid-token",
            Self::UpstreamStatus { status, .. } if *status >= 500 => "upstream-unavailable",
            Self::UpstreamStatus { .. } => "upstream-error",
            Self::Timeout => "upstream-unavailable",
            Self::Transport(_) => "upstream-unavailable",
            Self::InvalidConfiguration { .. } => "client-configuration",
        }
    }
}

/// Errors while checking a webhook signature header.
///
/// A malformed header is reported separately from a well-formed header that
/// simply does not match; both end in a 401, but operators want to tell a
/// misconfigured producer apart from a forged request.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// The signature header is missing, has the wrong prefix, or is not
    /// valid hex.
    #[error("Invalid signature header: {message}")]
    InvalidFormat { message: String },

    /// HMAC computation failed (unusable secret).
    #[error("HMAC computation failed: {message}")]
    Hmac { message: String },
}

/// Input validation errors for identifiers and configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing.
    #[error("Required field missing: {field}")]
    Required { field: String },

    /// A field has an invalid format.
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
