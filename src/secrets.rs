//! Secret storage for provider API keys
//!
//! Values are stored in the OS keychain when one is available; the database
//! only ever holds an opaque token. On systems without a usable keychain the
//! store degrades to base64-encoded tokens. That is encoding, not
//! encryption, and a warning is logged whenever it happens.
//!
//! Token formats:
//! - `keyring:<identifier>`: value lives in the OS keychain under that name
//! - `b64:<encoded>`: value is base64-encoded inline (fallback)
//! - anything else is treated as a legacy plaintext value

use base64::{engine::general_purpose, Engine as _};
use std::sync::OnceLock;
use thiserror::Error;

const SERVICE_NAME: &str = "DevStudio";
const KEYRING_PREFIX: &str = "keyring:";
const FALLBACK_PREFIX: &str = "b64:";
const PROBE_ENTRY: &str = "__devstudio_keyring_probe__";

#[derive(Debug, Error)]
pub enum SecretsError {
    #[error("Keychain error: {0}")]
    Keychain(String),
    #[error("System keychain is not available")]
    KeychainUnavailable,
    #[error("Encryption error: {0}")]
    Encryption(String),
    #[error("Decryption error: {0}")]
    Decryption(String),
    #[error("Secret not found: {0}")]
    NotFound(String),
}

/// Keychain-backed secret store with a base64 fallback
pub struct SecretStore {
    service: String,
    keyring_enabled: bool,
    availability: OnceLock<bool>,
}

impl Default for SecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            keyring_enabled: true,
            availability: OnceLock::new(),
        }
    }

    /// A store that never touches the keychain and always produces base64
    /// tokens. For headless environments (CI, containers) and tests.
    pub fn fallback_only() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            keyring_enabled: false,
            availability: OnceLock::new(),
        }
    }

    /// Whether the OS keychain is usable. Probed once with a set/delete
    /// round trip and cached for the lifetime of the store.
    pub fn is_keyring_available(&self) -> bool {
        if !self.keyring_enabled {
            return false;
        }
        *self.availability.get_or_init(|| {
            let available = self.probe_keyring();
            if !available {
                tracing::warn!(
                    "system keychain unavailable, falling back to base64 encoding; \
                     stored API keys will NOT be encrypted"
                );
            }
            available
        })
    }

    fn probe_keyring(&self) -> bool {
        let entry = match keyring::Entry::new(&self.service, PROBE_ENTRY) {
            Ok(entry) => entry,
            Err(_) => return false,
        };
        if entry.set_password("probe").is_err() {
            return false;
        }
        let _ = entry.delete_credential();
        true
    }

    /// Store `plaintext` under `identifier` and return the token to persist
    /// in the database. Never returns the plaintext itself when the keychain
    /// path is taken.
    pub fn encrypt(&self, identifier: &str, plaintext: &str) -> Result<String, SecretsError> {
        if self.is_keyring_available() {
            match keyring::Entry::new(&self.service, identifier)
                .and_then(|entry| entry.set_password(plaintext))
            {
                Ok(()) => return Ok(format!("{}{}", KEYRING_PREFIX, identifier)),
                Err(e) => {
                    tracing::error!(
                        identifier,
                        "keychain write failed, using base64 fallback: {}",
                        e
                    );
                }
            }
        }

        let encoded = general_purpose::STANDARD.encode(plaintext.as_bytes());
        Ok(format!("{}{}", FALLBACK_PREFIX, encoded))
    }

    /// Resolve a stored token back to its plaintext value
    pub fn decrypt(&self, identifier: &str, token: &str) -> Result<String, SecretsError> {
        if let Some(name) = token.strip_prefix(KEYRING_PREFIX) {
            if !self.is_keyring_available() {
                return Err(SecretsError::Decryption(format!(
                    "token for '{}' is keychain-backed but no keychain is available",
                    name
                )));
            }
            let entry = keyring::Entry::new(&self.service, name)
                .map_err(|e| SecretsError::Keychain(e.to_string()))?;
            return match entry.get_password() {
                Ok(value) => Ok(value),
                Err(keyring::Error::NoEntry) => Err(SecretsError::NotFound(name.to_string())),
                Err(e) => Err(SecretsError::Decryption(e.to_string())),
            };
        }

        if let Some(encoded) = token.strip_prefix(FALLBACK_PREFIX) {
            let bytes = general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| SecretsError::Decryption(e.to_string()))?;
            return String::from_utf8(bytes)
                .map_err(|e| SecretsError::Decryption(e.to_string()));
        }

        // Value predates the token scheme; pass it through unchanged
        tracing::warn!(identifier, "secret has no token prefix, treating as legacy plaintext");
        Ok(token.to_string())
    }

    /// Best-effort removal of a stored secret
    pub fn delete(&self, identifier: &str) -> Result<(), SecretsError> {
        if !self.is_keyring_available() {
            return Ok(());
        }
        let entry = keyring::Entry::new(&self.service, identifier)
            .map_err(|e| SecretsError::Keychain(e.to_string()))?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretsError::Keychain(e.to_string())),
        }
    }
}
