//! Byte transformations applied to license keys between the repository
//! envelope and the store, e.g. compression or encryption.

use crate::LicenseError;

/// A reversible byte transformation.
///
/// `backward` must reproduce the exact input of `forward` for the manager's
/// cached decoders to stay consistent with what was persisted.
pub trait Transformation: Send + Sync {
    /// Applied when writing a license key to a store.
    fn forward(&self, data: Vec<u8>) -> Result<Vec<u8>, LicenseError>;

    /// Applied when reading a license key from a store.
    fn backward(&self, data: Vec<u8>) -> Result<Vec<u8>, LicenseError>;
}

/// The do-nothing transformation. License keys are stored as encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transformation for Identity {
    fn forward(&self, data: Vec<u8>) -> Result<Vec<u8>, LicenseError> {
        Ok(data)
    }

    fn backward(&self, data: Vec<u8>) -> Result<Vec<u8>, LicenseError> {
        Ok(data)
    }
}
