//! Asymmetric signature engines.
//!
//! The repository controller is written against these traits rather than a
//! concrete scheme; Ed25519 is the one shipped implementation.

use crate::LicenseError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

/// Canonical algorithm name of the shipped engines.
pub const ED25519: &str = "Ed25519";

/// A signature engine initialized for signing.
pub trait SigningEngine: Send + Sync {
    /// Name of the signature algorithm, compared case-insensitively against
    /// the algorithm recorded in a repository.
    fn algorithm(&self) -> &str;

    /// Sign the given bytes, returning the raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, LicenseError>;
}

/// A signature engine initialized for verifying.
pub trait VerifyingEngine: Send + Sync {
    /// Name of the signature algorithm.
    fn algorithm(&self) -> &str;

    /// Verify the signature over the given bytes.
    ///
    /// Returns `Ok(false)` on any mismatch, including a malformed signature;
    /// the caller maps that to an integrity error.
    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, LicenseError>;
}

/// Ed25519 signing engine over a private key.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Create a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(seed),
        }
    }

    /// Create a signer from a hex-encoded 32-byte seed.
    pub fn from_hex(hex_seed: &str) -> Result<Self, LicenseError> {
        let bytes = hex::decode(hex_seed)
            .map_err(|e| LicenseError::Config(format!("invalid signing key hex: {}", e)))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LicenseError::Config("signing key must be 32 bytes".to_string()))?;
        Ok(Self::from_seed(&seed))
    }

    /// The matching verifying key, hex-encoded.
    pub fn verifying_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }
}

impl SigningEngine for Ed25519Signer {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, LicenseError> {
        Ok(self.key.sign(data).to_vec())
    }
}

/// Ed25519 verifying engine over a public key.
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Create a verifier from a hex-encoded 32-byte public key.
    pub fn from_hex(hex_key: &str) -> Result<Self, LicenseError> {
        let bytes = hex::decode(hex_key)
            .map_err(|e| LicenseError::Config(format!("invalid public key hex: {}", e)))?;
        let key_array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| LicenseError::Config("public key must be 32 bytes".to_string()))?;
        let key = VerifyingKey::from_bytes(&key_array)
            .map_err(|e| LicenseError::Config(format!("invalid Ed25519 public key: {}", e)))?;
        Ok(Self { key })
    }
}

impl VerifyingEngine for Ed25519Verifier {
    fn algorithm(&self) -> &str {
        ED25519
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool, LicenseError> {
        let Ok(sig_array) = <[u8; 64]>::try_from(signature) else {
            return Ok(false);
        };
        let signature = Signature::from_bytes(&sig_array);
        Ok(self.key.verify(data, &signature).is_ok())
    }
}
