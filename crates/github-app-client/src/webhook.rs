//! Webhook signature verification.
//!
//! Provides HMAC-SHA256 signature verification for inbound webhooks using
//! constant-time comparison to prevent timing attacks.

use zeroize::Zeroizing;

use crate::error::SignatureError;

/// Shared webhook secret used to key the HMAC.
///
/// The secret is process-wide configuration, never derived from a request.
/// Backing storage is zeroized on drop and the value never appears in Debug
/// output.
#[derive(Clone)]
pub struct WebhookSecret {
    secret: Zeroizing<String>,
}

impl WebhookSecret {
    /// Wrap a configured secret value.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Whether a non-empty secret was configured.
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

// Security: Don't expose the secret in debug output
impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecret")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// Verifies webhook signatures using HMAC-SHA256.
///
/// The verifier checks the `X-Hub-Signature-256` header value against the
/// raw request body using the shared webhook secret.
///
/// # Security
///
/// - Uses constant-time comparison to prevent timing attacks
/// - Never logs the secret or signature values
/// - Validates signature format before HMAC computation
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
}

impl SignatureVerifier {
    /// Create a new verifier over the shared webhook secret.
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Verify a webhook signature against the raw payload bytes.
    ///
    /// # Arguments
    ///
    /// * `payload` - The raw webhook body bytes, exactly as received
    /// * `signature` - The header value (format: `sha256=<hex>`)
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Signature matches
    /// * `Ok(false)` - Signature is well-formed but does not match
    /// * `Err` - Header is malformed or the secret is unusable
    ///
    /// Callers treat `Ok(false)` and `Err` identically at the HTTP layer
    /// (reject with 401); the distinction only feeds logging.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<bool, SignatureError> {
        let signature_bytes = self.parse_signature(signature)?;
        let expected_hmac = self.compute_hmac(payload)?;
        Ok(constant_time_compare(&signature_bytes, &expected_hmac))
    }

    /// Parse the producer's signature format.
    ///
    /// Extracts hex-encoded signature bytes from the `sha256=<hex>` header
    /// value. Only a short prefix of the offending value ever reaches the
    /// error message.
    fn parse_signature(&self, signature: &str) -> Result<Vec<u8>, SignatureError> {
        const PREFIX: &str = "sha256=";
        let hex_signature =
            signature
                .strip_prefix(PREFIX)
                .ok_or_else(|| SignatureError::InvalidFormat {
                    message: format!(
                        "signature must start with '{}', got: '{}'",
                        PREFIX,
                        signature.chars().take(10).collect::<String>()
                    ),
                })?;

        hex::decode(hex_signature).map_err(|e| SignatureError::InvalidFormat {
            message: format!("invalid hex encoding in signature: {}", e),
        })
    }

    /// Compute the expected HMAC-SHA256 digest of the payload.
    fn compute_hmac(&self, payload: &[u8]) -> Result<Vec<u8>, SignatureError> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|e| SignatureError::Hmac {
                message: format!("failed to create HMAC instance: {}", e),
            })?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

// Security: Don't expose the secret in debug output
impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// Constant-time comparison of two digests.
///
/// The length check is not constant time; digest lengths are public
/// (always 32 bytes for SHA-256) so this leaks nothing useful.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
