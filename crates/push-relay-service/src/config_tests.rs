//! Tests for configuration loading and validation.

use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;
use crate::test_keys::TEST_PKCS8_KEY;

// ============================================================================
// Helpers
// ============================================================================

/// A fully populated configuration that passes validation.
fn valid_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.webhook.secret = "webhook-secret".to_string();
    config.github.app_id = 123456;
    config.github.private_key = Some(TEST_PKCS8_KEY.to_string());
    config.github.organization = "acme".to_string();
    config.registry.base_url = "https://registry.example.com".to_string();
    config.registry.credential = "registry-credential".to_string();
    config.dispatch.repository = "acme/relay-target".to_string();
    config
}

// ============================================================================
// Defaults
// ============================================================================

/// Verify the documented defaults so a bare environment-only deployment
/// starts from known values.
#[test]
fn test_defaults_match_documentation() {
    let config = RelayConfig::default();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
    assert_eq!(config.webhook.path, "/");
    assert_eq!(config.filter.tracked_pattern, "**/package.json");
    assert_eq!(config.registry.timeout_seconds, 10);
    assert_eq!(config.github.api_url, "https://api.github.com");
    assert!(!config.github.cache_tokens);
    assert_eq!(config.dispatch.event_type, "upstream-push");
    assert_eq!(config.logging.level, "info");
    assert!(!config.logging.json_format);
}

/// Verify a default configuration does not validate; secrets and targets
/// have no sensible defaults.
#[test]
fn test_default_config_fails_validation() {
    assert!(RelayConfig::default().validate().is_err());
}

/// Verify an empty document deserializes entirely from defaults.
#[test]
fn test_empty_document_deserializes_to_defaults() {
    let config: RelayConfig = serde_json::from_str("{}").unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.filter.tracked_pattern, "**/package.json");
}

/// Verify a partial section keeps defaults for its other fields.
#[test]
fn test_partial_section_keeps_remaining_defaults() {
    let config: RelayConfig =
        serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();

    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.max_body_size, 10 * 1024 * 1024);
}

// ============================================================================
// Validation
// ============================================================================

/// Verify a fully populated configuration validates.
#[test]
fn test_valid_config_passes_validation() {
    assert!(valid_config().validate().is_ok());
}

/// Verify an empty webhook secret is reported by key.
#[test]
fn test_missing_webhook_secret_is_rejected() {
    let mut config = valid_config();
    config.webhook.secret = String::new();

    match config.validate() {
        Err(ConfigError::Missing { key }) => assert_eq!(key, "webhook.secret"),
        other => panic!("expected missing webhook.secret, got {:?}", other),
    }
}

/// Verify the webhook path must be absolute.
#[test]
fn test_relative_webhook_path_is_rejected() {
    let mut config = valid_config();
    config.webhook.path = "hooks".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { .. })
    ));
}

/// Verify a zero App ID is treated as unset.
#[test]
fn test_zero_app_id_is_rejected() {
    let mut config = valid_config();
    config.github.app_id = 0;

    match config.validate() {
        Err(ConfigError::Missing { key }) => assert_eq!(key, "github.app_id"),
        other => panic!("expected missing github.app_id, got {:?}", other),
    }
}

/// Verify a configuration without any private key source is rejected.
#[test]
fn test_missing_private_key_is_rejected() {
    let mut config = valid_config();
    config.github.private_key = None;
    config.github.private_key_file = None;

    match config.validate() {
        Err(ConfigError::Missing { key }) => assert_eq!(key, "github.private_key"),
        other => panic!("expected missing github.private_key, got {:?}", other),
    }
}

/// Verify inline key and key file cannot both be set; silently preferring
/// one would mask an operator mistake.
#[test]
fn test_both_private_key_sources_are_rejected() {
    let mut config = valid_config();
    config.github.private_key_file = Some("/etc/relay/key.pem".to_string());

    match config.validate() {
        Err(ConfigError::Invalid { message }) => {
            assert!(message.contains("mutually exclusive"));
        }
        other => panic!("expected invalid config, got {:?}", other),
    }
}

/// Verify the organization is required.
#[test]
fn test_missing_organization_is_rejected() {
    let mut config = valid_config();
    config.github.organization = String::new();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { key }) if key == "github.organization"
    ));
}

/// Verify the registry base URL and credential are both required.
#[test]
fn test_missing_registry_settings_are_rejected() {
    let mut config = valid_config();
    config.registry.base_url = String::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { key }) if key == "registry.base_url"
    ));

    let mut config = valid_config();
    config.registry.credential = String::new();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { key }) if key == "registry.credential"
    ));
}

/// Verify the dispatch repository must name an owner/name pair.
#[test]
fn test_dispatch_repository_without_owner_is_rejected() {
    let mut config = valid_config();
    config.dispatch.repository = "widgets".to_string();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { .. })
    ));
}

/// Verify an empty dispatch event type is rejected.
#[test]
fn test_empty_dispatch_event_type_is_rejected() {
    let mut config = valid_config();
    config.dispatch.event_type = String::new();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Missing { key }) if key == "dispatch.event_type"
    ));
}

/// Verify an unparseable tracked pattern is caught at validation time, not
/// at the first delivery.
#[test]
fn test_unparseable_tracked_pattern_is_rejected() {
    let mut config = valid_config();
    config.filter.tracked_pattern = String::new();

    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid { .. })
    ));
}

// ============================================================================
// Private key resolution
// ============================================================================

/// Verify the inline key is returned verbatim.
#[test]
fn test_inline_private_key_is_resolved() {
    let config = valid_config();

    assert_eq!(
        config.github.resolved_private_key().unwrap(),
        TEST_PKCS8_KEY
    );
}

/// Verify a key file is read from disk.
#[test]
fn test_private_key_file_is_read() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", TEST_PKCS8_KEY).unwrap();
    file.flush().unwrap();

    let mut config = valid_config();
    config.github.private_key = None;
    config.github.private_key_file = Some(file.path().to_string_lossy().into_owned());

    assert_eq!(
        config.github.resolved_private_key().unwrap(),
        TEST_PKCS8_KEY
    );
}

/// Verify an unreadable key file reports its path.
#[test]
fn test_unreadable_private_key_file_is_an_error() {
    let mut config = valid_config();
    config.github.private_key = None;
    config.github.private_key_file = Some("/nonexistent/relay/key.pem".to_string());

    match config.github.resolved_private_key() {
        Err(ConfigError::Invalid { message }) => {
            assert!(message.contains("/nonexistent/relay/key.pem"));
        }
        other => panic!("expected invalid config, got {:?}", other),
    }
}

/// Verify resolution without any source is a missing-key error.
#[test]
fn test_resolution_without_sources_is_missing() {
    let config = GitHubConfig::default();

    assert!(matches!(
        config.resolved_private_key(),
        Err(ConfigError::Missing { .. })
    ));
}

// ============================================================================
// Layered loading
// ============================================================================

/// Verify environment variables override defaults using the double
/// underscore separator.
#[test]
#[serial]
fn test_environment_variables_override_defaults() {
    std::env::set_var("RELAY__SERVER__PORT", "9191");
    std::env::set_var("RELAY__WEBHOOK__SECRET", "from-env");

    let result = RelayConfig::load();

    std::env::remove_var("RELAY__SERVER__PORT");
    std::env::remove_var("RELAY__WEBHOOK__SECRET");

    let config = result.unwrap();
    assert_eq!(config.server.port, 9191);
    assert_eq!(config.webhook.secret, "from-env");
}

/// Verify the file named by RELAY_CONFIG_FILE layers over defaults.
#[test]
#[serial]
fn test_explicit_config_file_layers_over_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server:").unwrap();
    writeln!(file, "  port: 7070").unwrap();
    writeln!(file, "webhook:").unwrap();
    writeln!(file, "  secret: from-file").unwrap();
    file.flush().unwrap();

    std::env::set_var("RELAY_CONFIG_FILE", file.path());

    let result = RelayConfig::load();

    std::env::remove_var("RELAY_CONFIG_FILE");

    let config = result.unwrap();
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.webhook.secret, "from-file");
}

/// Verify environment variables win over the explicit config file.
#[test]
#[serial]
fn test_environment_wins_over_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server:").unwrap();
    writeln!(file, "  port: 7070").unwrap();
    file.flush().unwrap();

    std::env::set_var("RELAY_CONFIG_FILE", file.path());
    std::env::set_var("RELAY__SERVER__PORT", "9999");

    let result = RelayConfig::load();

    std::env::remove_var("RELAY_CONFIG_FILE");
    std::env::remove_var("RELAY__SERVER__PORT");

    assert_eq!(result.unwrap().server.port, 9999);
}

/// Verify a missing explicit config file fails loading instead of being
/// silently skipped; the operator asked for it by name.
#[test]
#[serial]
fn test_missing_explicit_config_file_fails_loading() {
    std::env::set_var("RELAY_CONFIG_FILE", "/nonexistent/relay/config.yaml");

    let result = RelayConfig::load();

    std::env::remove_var("RELAY_CONFIG_FILE");

    assert!(result.is_err());
}

// ============================================================================
// Error display
// ============================================================================

/// Verify error messages name the offending key.
#[test]
fn test_error_display_names_the_key() {
    let error = ConfigError::Missing {
        key: "webhook.secret".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Missing required configuration: webhook.secret"
    );
}
