//! GitHub App authentication types.
//!
//! This module provides the core authentication types for acting as a
//! GitHub App:
//! - ID types ([`AppId`], [`InstallationId`])
//! - Credential material ([`AppCredentials`])
//! - Token types ([`AppJwt`], [`InstallationToken`])
//! - A [`Clock`] abstraction so token lifetimes are testable

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

pub mod cache;
pub mod jwt;
pub mod keys;

pub use cache::{InMemoryTokenCache, TokenCache};
pub use jwt::{JwtClaims, JwtMinter};
pub use keys::{PrivateKeyPem, RsaSigner};

// ============================================================================
// Core ID Types
// ============================================================================

/// GitHub App identifier assigned during app registration.
///
/// This is a globally unique identifier for the GitHub App, found on the app
/// settings page. It becomes the `iss` claim of app JWTs, where GitHub
/// requires it to appear as a JSON number.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::AppId;
///
/// let app_id = AppId::new(123456);
/// assert_eq!(app_id.as_u64(), 123456);
/// assert_eq!(app_id.to_string(), "123456");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(u64);

impl AppId {
    /// Create a new GitHub App ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "app_id".to_string(),
                message: "must be a positive integer".to_string(),
            })?;
        Ok(Self::new(id))
    }
}

/// GitHub App installation identifier for a specific account.
///
/// When a GitHub App is installed on an organization or user account, GitHub
/// assigns an installation ID. The ID is used to exchange an app JWT for an
/// installation access token.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::InstallationId;
///
/// let installation = InstallationId::new(98765);
/// assert_eq!(installation.as_u64(), 98765);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Create a new installation ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "installation_id".to_string(),
                message: "must be a positive integer".to_string(),
            })?;
        Ok(Self::new(id))
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Credential material identifying a GitHub App.
///
/// Pairs the app ID with the RSA private key registered for the app. The key
/// is only parsed when a JWT is actually minted, so constructing credentials
/// never fails.
///
/// The private key is never exposed in Debug output.
#[derive(Clone)]
pub struct AppCredentials {
    app_id: AppId,
    private_key: PrivateKeyPem,
}

impl AppCredentials {
    /// Create credentials from an app ID and a PEM-encoded private key.
    pub fn new(app_id: AppId, private_key: PrivateKeyPem) -> Self {
        Self {
            app_id,
            private_key,
        }
    }

    /// Get the app ID.
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Get the private key material.
    pub fn private_key(&self) -> &PrivateKeyPem {
        &self.private_key
    }
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Token Types
// ============================================================================

/// Signed JWT for GitHub App authentication.
///
/// App JWTs authenticate as the app itself, not as an installation. They are
/// short-lived (ten minutes) and are only used to call the app-scoped
/// endpoints that list installations and mint installation tokens.
///
/// The token string is never exposed in Debug output.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::{AppJwt, AppId};
/// use chrono::{Utc, Duration};
///
/// let issued_at = Utc::now();
/// let jwt = AppJwt::new(
///     "encoded.jwt.token".to_string(),
///     AppId::new(123),
///     issued_at,
///     issued_at + Duration::minutes(10),
/// );
///
/// assert!(!jwt.is_expired());
/// assert_eq!(jwt.app_id(), AppId::new(123));
/// ```
#[derive(Clone)]
pub struct AppJwt {
    token: String,
    app_id: AppId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl AppJwt {
    /// Create a new app JWT.
    ///
    /// # Arguments
    ///
    /// * `token` - The encoded JWT string
    /// * `app_id` - The GitHub App the token authenticates as
    /// * `issued_at` - The `iat` claim of the token
    /// * `expires_at` - The `exp` claim of the token
    pub fn new(
        token: String,
        app_id: AppId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token,
            app_id,
            issued_at,
            expires_at,
        }
    }

    /// Get the token string for use in API requests.
    ///
    /// Sent as `Authorization: Bearer <token>`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the GitHub App ID this token authenticates as.
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Get when this token was issued.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Get when this token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is currently expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the token will expire within `margin`.
    pub fn expires_soon(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

// Security: don't expose the token in debug output.
impl std::fmt::Debug for AppJwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppJwt")
            .field("app_id", &self.app_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// Installation-scoped access token for GitHub API operations.
///
/// Installation tokens act on behalf of a specific installation and carry the
/// permissions the installation granted. GitHub issues them with a one-hour
/// lifetime.
///
/// The token string is never exposed in Debug output.
///
/// # Examples
///
/// ```
/// use github_app_client::auth::{InstallationToken, InstallationId};
/// use chrono::{Utc, Duration};
///
/// let token = InstallationToken::new(
///     "ghs_token".to_string(),
///     InstallationId::new(456),
///     Utc::now() + Duration::hours(1),
/// );
///
/// assert_eq!(token.installation_id(), InstallationId::new(456));
/// assert!(!token.is_expired());
/// ```
#[derive(Clone)]
pub struct InstallationToken {
    token: String,
    installation_id: InstallationId,
    expires_at: DateTime<Utc>,
}

impl InstallationToken {
    /// Create a new installation token.
    ///
    /// # Arguments
    ///
    /// * `token` - The token string from the GitHub API
    /// * `installation_id` - The installation this token acts for
    /// * `expires_at` - When the token expires (typically one hour out)
    pub fn new(token: String, installation_id: InstallationId, expires_at: DateTime<Utc>) -> Self {
        Self {
            token,
            installation_id,
            expires_at,
        }
    }

    /// Get the token string for use in API requests.
    ///
    /// Sent as `Authorization: Bearer <token>`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Get the installation this token acts for.
    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    /// Get when this token expires.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Check if the token is currently expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Check if the token will expire within `margin`.
    pub fn expires_soon(&self, margin: Duration) -> bool {
        Utc::now() + margin >= self.expires_at
    }
}

// Security: don't expose the token in debug output.
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("installation_id", &self.installation_id)
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Clock Abstraction
// ============================================================================

/// Source of the current time.
///
/// JWT claim windows and token freshness checks depend on wall-clock time;
/// routing them through this trait lets tests pin the clock instead of
/// sleeping.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
