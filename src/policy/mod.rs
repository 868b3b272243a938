//! License initialization and validation policies.
//!
//! Initialization fills defaults into a license before a key is generated.
//! Validation decides whether an installed or loaded license is acceptable
//! for its subject right now.

mod init;
mod validate;

pub use init::StandardInitialization;
pub use validate::StandardValidation;

use crate::license::License;
use crate::LicenseError;

/// Initializes missing properties of a license bean in place.
pub trait LicenseInitialization: Send + Sync {
    /// Fill defaults for any unset property.
    fn initialize(&self, license: &mut License) -> Result<(), LicenseError>;
}

/// Validates the properties of a license bean.
pub trait LicenseValidation: Send + Sync {
    /// Check the license; an `Err` means it must not be accepted.
    fn validate(&self, license: &License) -> Result<(), LicenseError>;
}
