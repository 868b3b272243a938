//! Keystore abstraction: named key entries behind password protection.
//!
//! This is the in-ecosystem stand-in for a platform key-management facility:
//! a JSON document mapping aliases to Ed25519 key material, with SHA-256
//! password digests guarding the store and each private key entry.

use crate::store::Source;
use crate::LicenseError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The keystore type written and read by this crate.
pub const KEYWARD_STORE_TYPE: &str = "keyward";

fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Provides a password on demand.
///
/// Repeated calls must yield equal values so that callers may cache the
/// outcome of a password check.
pub trait PasswordProtection: Send + Sync {
    /// Obtain the protected password.
    fn password(&self) -> Result<String, LicenseError>;
}

/// Password protection holding the password in memory.
#[derive(Clone)]
pub struct PlainPassword(String);

impl PlainPassword {
    /// Wrap a password.
    pub fn new(password: impl Into<String>) -> Arc<dyn PasswordProtection> {
        Arc::new(Self(password.into()))
    }
}

impl PasswordProtection for PlainPassword {
    fn password(&self) -> Result<String, LicenseError> {
        Ok(self.0.clone())
    }
}

/// Checks passwords against a strength policy before private key access.
pub trait PasswordPolicy: Send + Sync {
    /// Check the password, failing with an authentication error when it does
    /// not meet the policy.
    fn check(&self, password: &str) -> Result<(), LicenseError>;
}

/// Default policy: at least eight characters containing both letters and
/// digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPasswordPolicy;

impl PasswordPolicy for DefaultPasswordPolicy {
    fn check(&self, password: &str) -> Result<(), LicenseError> {
        if password.chars().count() < 8 {
            return Err(LicenseError::Authentication(
                "password must have at least eight characters".to_string(),
            ));
        }
        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        if !has_letter || !has_digit {
            return Err(LicenseError::Authentication(
                "password must contain letters and digits".to_string(),
            ));
        }
        Ok(())
    }
}

/// A policy accepting any password, for deployments where the keystore file
/// itself is access controlled.
#[derive(Debug, Clone, Copy, Default)]
pub struct UncheckedPasswordPolicy;

impl PasswordPolicy for UncheckedPasswordPolicy {
    fn check(&self, _password: &str) -> Result<(), LicenseError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeystoreEntry {
    algorithm: String,
    verifying_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signing_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_digest: Option<String>,
}

/// A password-protected collection of named key entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystore {
    #[serde(rename = "type")]
    store_type: String,
    digest: String,
    entries: BTreeMap<String, KeystoreEntry>,
}

impl Keystore {
    /// Create an empty keystore protected by the given password.
    pub fn create(store_password: &str) -> Self {
        Self {
            store_type: KEYWARD_STORE_TYPE.to_string(),
            digest: password_digest(store_password),
            entries: BTreeMap::new(),
        }
    }

    /// Add a private key entry (vendor side). The verifying key is derived
    /// from the seed. An optional key password guards private key access.
    pub fn with_key_pair(
        mut self,
        alias: &str,
        seed: &[u8; 32],
        key_password: Option<&str>,
    ) -> Self {
        let signer = crate::crypto::engine::Ed25519Signer::from_seed(seed);
        self.entries.insert(
            alias.to_string(),
            KeystoreEntry {
                algorithm: crate::crypto::engine::ED25519.to_string(),
                verifying_key: signer.verifying_key_hex(),
                signing_key: Some(hex::encode(seed)),
                key_digest: key_password.map(password_digest),
            },
        );
        self
    }

    /// Add a public-key-only entry (consumer side).
    pub fn with_verifying_key(mut self, alias: &str, verifying_key_hex: &str) -> Self {
        self.entries.insert(
            alias.to_string(),
            KeystoreEntry {
                algorithm: crate::crypto::engine::ED25519.to_string(),
                verifying_key: verifying_key_hex.to_string(),
                signing_key: None,
                key_digest: None,
            },
        );
        self
    }

    /// Serialize for persistence through a store.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LicenseError> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| LicenseError::Authentication(format!("keystore encode: {}", e)))
    }

    /// Parse and unlock a keystore of the expected type.
    pub fn from_bytes(
        data: &[u8],
        expected_type: &str,
        store_password: &str,
    ) -> Result<Self, LicenseError> {
        let keystore: Keystore = serde_json::from_slice(data)
            .map_err(|e| LicenseError::Authentication(format!("keystore decode: {}", e)))?;
        if !keystore.store_type.eq_ignore_ascii_case(expected_type) {
            return Err(LicenseError::Authentication(format!(
                "keystore type {:?} does not match expected type {:?}",
                keystore.store_type, expected_type
            )));
        }
        if keystore.digest != password_digest(store_password) {
            return Err(LicenseError::Authentication(
                "wrong keystore password".to_string(),
            ));
        }
        Ok(keystore)
    }

    fn entry(&self, alias: &str) -> Result<&KeystoreEntry, LicenseError> {
        self.entries
            .get(alias)
            .ok_or_else(|| LicenseError::Authentication(format!("no such entry: {:?}", alias)))
    }

    /// The signature algorithm recorded for the entry.
    pub fn algorithm(&self, alias: &str) -> Result<&str, LicenseError> {
        Ok(&self.entry(alias)?.algorithm)
    }

    /// The hex-encoded verifying key of the entry.
    pub fn verifying_key_hex(&self, alias: &str) -> Result<&str, LicenseError> {
        Ok(&self.entry(alias)?.verifying_key)
    }

    /// The hex-encoded signing key seed, after checking the key password.
    pub fn signing_key_hex(&self, alias: &str, key_password: &str) -> Result<&str, LicenseError> {
        let entry = self.entry(alias)?;
        let seed = entry.signing_key.as_deref().ok_or_else(|| {
            LicenseError::Authentication(format!("no private key for entry: {:?}", alias))
        })?;
        if let Some(expected) = &entry.key_digest {
            if *expected != password_digest(key_password) {
                return Err(LicenseError::Authentication(format!(
                    "wrong key password for entry: {:?}",
                    alias
                )));
            }
        }
        Ok(seed)
    }
}

/// Keystore address: everything needed to locate one key entry.
///
/// Plain owned data, so repeated reads trivially yield identical values.
#[derive(Clone)]
pub struct KeystoreParameters {
    /// Name of the keystore entry.
    pub alias: String,
    /// Keystore type, defaulting to [`KEYWARD_STORE_TYPE`].
    pub store_type: String,
    /// Byte stream providing the persisted keystore. Absent means an empty
    /// keystore, so every alias lookup fails.
    pub source: Option<Arc<dyn Source>>,
    /// Signature algorithm override; inherited from the entry when absent.
    pub algorithm: Option<String>,
    /// Password protecting the private key; falls back to the store
    /// protection when absent.
    pub key_protection: Option<Arc<dyn PasswordProtection>>,
    /// Password protecting the keystore itself.
    pub store_protection: Arc<dyn PasswordProtection>,
}

impl KeystoreParameters {
    /// Address an entry in a keystore protected by the given password.
    pub fn new(alias: impl Into<String>, store_protection: Arc<dyn PasswordProtection>) -> Self {
        Self {
            alias: alias.into(),
            store_type: KEYWARD_STORE_TYPE.to_string(),
            source: None,
            algorithm: None,
            key_protection: None,
            store_protection,
        }
    }

    /// Load the keystore from the given source.
    pub fn load_from(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the signature algorithm.
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Protect the private key with its own password.
    pub fn key_protection(mut self, protection: Arc<dyn PasswordProtection>) -> Self {
        self.key_protection = Some(protection);
        self
    }

    /// Override the keystore type.
    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = store_type.into();
        self
    }

    /// The effective key password: the key protection or, absent that, the
    /// store protection.
    pub fn key_password(&self) -> Result<String, LicenseError> {
        match &self.key_protection {
            Some(protection) => protection.password(),
            None => self.store_protection.password(),
        }
    }
}
