//! Configuration loading and validation for the relay service.
//!
//! Configuration merges four layers, later layers winning: an optional
//! `config.yaml`, an optional `local.yaml`, an optional explicit file named
//! by the `RELAY_CONFIG_FILE` environment variable, and `RELAY__`-prefixed
//! environment variables (`RELAY__SERVER__PORT=9090`). Every field carries a
//! default so the service can be configured from the environment alone;
//! [`RelayConfig::validate`] then rejects anything the relay cannot actually
//! run with, before the server binds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use push_relay_core::TrackedPattern;

/// Configuration errors surfaced before the server starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value in any layer.
    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    /// A setting is present but unusable.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Inbound webhook endpoint settings
    pub webhook: WebhookConfig,

    /// Push relevance filtering
    pub filter: FilterConfig,

    /// Collaborator registry lookups
    pub registry: RegistrySettings,

    /// GitHub App credentials and API access
    pub github: GitHubConfig,

    /// Downstream dispatch target
    pub dispatch: DispatchConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Inbound webhook endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Path the webhook endpoint is served on
    pub path: String,

    /// Shared secret for signature verification
    pub secret: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            secret: String::new(),
        }
    }
}

/// Push relevance filter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Glob selecting the files whose changes are worth relaying
    pub tracked_pattern: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tracked_pattern: "**/package.json".to_string(),
        }
    }
}

/// Collaborator registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    /// Base URL of the registry service
    pub base_url: String,

    /// Bearer credential for registry reads
    pub credential: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            credential: String::new(),
            timeout_seconds: 10,
        }
    }
}

/// GitHub App configuration.
///
/// The private key can be supplied inline (`private_key`) or as a file path
/// (`private_key_file`); exactly one of the two must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Numeric GitHub App identifier
    pub app_id: u64,

    /// App private key as an inline PEM string
    pub private_key: Option<String>,

    /// Path to a file holding the App private key
    pub private_key_file: Option<String>,

    /// Organization whose installation is used for dispatching
    pub organization: String,

    /// GitHub API base URL
    pub api_url: String,

    /// Cache installation tokens between deliveries
    pub cache_tokens: bool,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            app_id: 0,
            private_key: None,
            private_key_file: None,
            organization: String::new(),
            api_url: "https://api.github.com".to_string(),
            cache_tokens: false,
            timeout_seconds: 10,
        }
    }
}

impl GitHubConfig {
    /// Load the private key from whichever source is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when neither source is set and
    /// [`ConfigError::Invalid`] when the key file cannot be read.
    pub fn resolved_private_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.private_key {
            return Ok(key.clone());
        }
        if let Some(path) = &self.private_key_file {
            return std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid {
                message: format!("failed to read github.private_key_file '{}': {}", path, e),
            });
        }
        Err(ConfigError::Missing {
            key: "github.private_key".to_string(),
        })
    }
}

/// Downstream dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Repository receiving the dispatch, as an `owner/name` pair
    pub repository: String,

    /// Event type name carried by the dispatch
    pub event_type: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            event_type: "upstream-push".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter
    pub level: String,

    /// Emit JSON-formatted log lines
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl RelayConfig {
    /// Load configuration from files and the environment.
    ///
    /// File layers are read relative to the working directory and are all
    /// optional except the one explicitly named by `RELAY_CONFIG_FILE`.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`config::ConfigError`] when a layer cannot be
    /// read or the merged settings do not deserialize.
    pub fn load() -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("config")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("local")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Ok(path) = std::env::var("RELAY_CONFIG_FILE") {
            builder = builder.add_source(
                config::File::with_name(&path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate settings the relay cannot run without.
    ///
    /// # Errors
    ///
    /// Returns the first problem found; operators fix one setting at a time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.secret.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhook.secret".to_string(),
            });
        }
        if !self.webhook.path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!("webhook.path '{}' must start with '/'", self.webhook.path),
            });
        }
        if self.github.app_id == 0 {
            return Err(ConfigError::Missing {
                key: "github.app_id".to_string(),
            });
        }
        if self.github.private_key.is_none() && self.github.private_key_file.is_none() {
            return Err(ConfigError::Missing {
                key: "github.private_key".to_string(),
            });
        }
        if self.github.private_key.is_some() && self.github.private_key_file.is_some() {
            return Err(ConfigError::Invalid {
                message: "github.private_key and github.private_key_file are mutually exclusive"
                    .to_string(),
            });
        }
        if self.github.organization.is_empty() {
            return Err(ConfigError::Missing {
                key: "github.organization".to_string(),
            });
        }
        if self.registry.base_url.is_empty() {
            return Err(ConfigError::Missing {
                key: "registry.base_url".to_string(),
            });
        }
        if self.registry.credential.is_empty() {
            return Err(ConfigError::Missing {
                key: "registry.credential".to_string(),
            });
        }
        if self.dispatch.repository.is_empty() {
            return Err(ConfigError::Missing {
                key: "dispatch.repository".to_string(),
            });
        }
        if !self.dispatch.repository.contains('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "dispatch.repository '{}' must be an owner/name pair",
                    self.dispatch.repository
                ),
            });
        }
        if self.dispatch.event_type.is_empty() {
            return Err(ConfigError::Missing {
                key: "dispatch.event_type".to_string(),
            });
        }
        if let Err(e) = TrackedPattern::new(&self.filter.tracked_pattern) {
            return Err(ConfigError::Invalid {
                message: e.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
