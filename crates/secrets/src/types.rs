//! Secure secret types with automatic memory zeroing
//!
//! This module provides types for handling sensitive values in memory:
//! - [`SecureSecret`]: A wrapper around `secrecy::SecretString` that auto-zeros on drop
//! - [`Credential`]: The short-lived bearer token issued by a login endpoint
//! - [`SecretEntry`]: A single key/value pair as returned by the secrets API

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A sensitive string value with automatic memory zeroing on drop.
///
/// This type wraps `secrecy::SecretString` to ensure:
/// - Secret values are zeroed from memory when dropped
/// - Debug output shows `[REDACTED]` instead of the actual value
/// - Explicit `.expose()` call required to access the value
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Create a new secure secret from a string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Expose the secret value for use.
    ///
    /// The caller must ensure the exposed value is not logged and is used
    /// only for the immediate operation (a form field, a header).
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Get the length of the secret value without exposing it.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Check if the secret value is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.inner.expose_secret().trim().is_empty()
    }

    /// Check if the secret value is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Opaque bearer credential issued by a login endpoint.
///
/// Lives for one run only: it is handed to the secret resolver once and
/// dropped at process end. Creating a credential registers its value with
/// the [`redaction`](crate::redaction) registry.
#[derive(Clone, Debug)]
pub struct Credential(SecureSecret);

impl Credential {
    /// Wrap an access token and register it for redaction.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let secret = SecureSecret::new(token);
        crate::redaction::register_secret(secret.expose());
        Self(secret)
    }

    /// The raw token, for an `Authorization: Bearer` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    /// Whether the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single secret as listed by the raw secrets endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    /// Secret name (case-sensitive).
    #[serde(rename = "secretKey")]
    pub key: String,
    /// Secret value, with references already expanded server-side.
    #[serde(rename = "secretValue")]
    pub value: String,
}

impl SecretEntry {
    /// Create an entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("key", &self.key)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
