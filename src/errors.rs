//! Keyward error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during license management.
///
/// All failures from the codec, keystore, repository and store layers are
/// funneled into this one reportable type at the manager boundary. UI layers
/// use [`LicenseError::is_confidential`] to decide whether the message may be
/// shown to an end user verbatim.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Configuration is invalid (missing builder fields, bad charset, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Signature verification over the repository body failed.
    ///
    /// This is the security-critical failure: the persisted license key does
    /// not match its signature and has probably been tampered with.
    #[error("license key integrity violated")]
    RepositoryIntegrity,

    /// The stored signature algorithm disagrees with the verifying engine.
    #[error("signature algorithm mismatch: stored {stored:?}, engine {engine:?}")]
    AlgorithmMismatch {
        /// Algorithm name recorded in the repository.
        stored: String,
        /// Algorithm name of the verifying engine.
        engine: String,
    },

    /// The license is authentic but inapplicable (expired, wrong subject, ...).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Keystore access failed: unreadable store, unknown alias, wrong
    /// password or password-policy rejection.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Encoding or decoding through the configured codec failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Store access failed.
    #[error("store I/O error: {0}")]
    Io(String),
}

impl LicenseError {
    /// Whether the details of this error must be withheld from end users.
    ///
    /// Validation failures describe the license the user already holds and
    /// are safe to display. Everything else may leak information about the
    /// signing infrastructure and gets a generic message instead.
    pub fn is_confidential(&self) -> bool {
        !matches!(self, LicenseError::Validation(_))
    }
}

/// A license that is legitimately signed but not applicable.
///
/// Each variant carries a stable message key for internationalization plus
/// the offending field value(s).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Consumer amount is zero or negative.
    #[error("consumer amount is not positive: {0}")]
    ConsumerAmountNotPositive(i64),

    /// Consumer type is absent.
    #[error("consumer type is not set")]
    ConsumerTypeMissing,

    /// Holder principal is absent.
    #[error("holder is not set")]
    HolderMissing,

    /// Issued timestamp is absent.
    #[error("issued date/time is not set")]
    IssuedMissing,

    /// Issuer principal is absent.
    #[error("issuer is not set")]
    IssuerMissing,

    /// The validity window has closed.
    #[error("license has expired at {not_after}")]
    Expired {
        /// End of the validity window.
        not_after: DateTime<Utc>,
    },

    /// The validity window has not opened yet.
    #[error("license is not yet valid before {not_before}")]
    NotYetValid {
        /// Start of the validity window.
        not_before: DateTime<Utc>,
    },

    /// The license subject does not match the managed subject.
    #[error("invalid subject: expected {expected:?}, found {found:?}")]
    SubjectMismatch {
        /// Subject configured in the context.
        expected: String,
        /// Subject found in the license, if any.
        found: Option<String>,
    },
}

impl ValidationError {
    /// Stable message key for lookup in a message catalog.
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationError::ConsumerAmountNotPositive(_) => "consumerAmountIsNotPositive",
            ValidationError::ConsumerTypeMissing => "consumerTypeIsNull",
            ValidationError::HolderMissing => "holderIsNull",
            ValidationError::IssuedMissing => "issuedIsNull",
            ValidationError::IssuerMissing => "issuerIsNull",
            ValidationError::Expired { .. } => "licenseHasExpired",
            ValidationError::NotYetValid { .. } => "licenseIsNotYetValid",
            ValidationError::SubjectMismatch { .. } => "invalidSubject",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn validation_errors_are_not_confidential() {
        let err = LicenseError::from(ValidationError::ConsumerTypeMissing);
        assert!(!err.is_confidential());
    }

    #[test]
    fn integrity_errors_are_confidential() {
        assert!(LicenseError::RepositoryIntegrity.is_confidential());
        assert!(LicenseError::Authentication("no such alias".into()).is_confidential());
        assert!(LicenseError::Config("empty subject".into()).is_confidential());
    }

    #[test]
    fn expired_carries_the_timestamp() {
        let not_after = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let err = ValidationError::Expired { not_after };
        assert!(err.to_string().contains("2025-06-01"));
        assert_eq!(err.message_key(), "licenseHasExpired");
    }
}
