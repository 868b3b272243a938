use crate::clock::Clock;
use crate::errors::ValidationError;
use crate::license::License;
use crate::policy::LicenseValidation;
use crate::LicenseError;
use std::sync::Arc;

/// Built-in validation: required properties must be present, the consumer
/// amount positive, the validity window open and the subject matching.
///
/// Window comparisons are strict on both ends, so a license is still valid
/// at the exact instant of `not_after` and already valid at `not_before`.
#[derive(Clone)]
pub struct StandardValidation {
    subject: String,
    clock: Arc<dyn Clock>,
}

impl StandardValidation {
    /// Bind the expected management subject and the clock.
    pub fn new(subject: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subject: subject.into(),
            clock,
        }
    }
}

impl LicenseValidation for StandardValidation {
    fn validate(&self, license: &License) -> Result<(), LicenseError> {
        if license.consumer_amount <= 0 {
            return Err(ValidationError::ConsumerAmountNotPositive(license.consumer_amount).into());
        }
        if license.consumer_type.is_none() {
            return Err(ValidationError::ConsumerTypeMissing.into());
        }
        if license.holder.is_none() {
            return Err(ValidationError::HolderMissing.into());
        }
        if license.issued.is_none() {
            return Err(ValidationError::IssuedMissing.into());
        }
        if license.issuer.is_none() {
            return Err(ValidationError::IssuerMissing.into());
        }
        let now = self.clock.now();
        if let Some(not_after) = license.not_after {
            if now > not_after {
                return Err(ValidationError::Expired { not_after }.into());
            }
        }
        if let Some(not_before) = license.not_before {
            if now < not_before {
                return Err(ValidationError::NotYetValid { not_before }.into());
            }
        }
        match license.subject.as_deref() {
            Some(subject) if subject == self.subject => Ok(()),
            found => Err(ValidationError::SubjectMismatch {
                expected: self.subject.clone(),
                found: found.map(str::to_string),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use chrono::Duration;

    fn clock() -> Arc<MockClock> {
        Arc::new(MockClock::from_rfc3339("2025-03-01T09:30:00Z"))
    }

    fn valid_license(clock: &MockClock) -> License {
        let mut license = License::new();
        license.subject = Some("MyApp 1.X".to_string());
        license.holder = Some("CN=Unknown".to_string());
        license.issuer = Some("CN=MyApp 1.X".to_string());
        license.issued = Some(clock.now());
        license.consumer_type = Some("User".to_string());
        license.consumer_amount = 1;
        license
    }

    #[test]
    fn accepts_a_complete_license() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        assert!(validation.validate(&valid_license(&clock)).is_ok());
    }

    #[test]
    fn window_edges_are_inclusive() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        let mut license = valid_license(&clock);
        license.not_before = Some(clock.now());
        license.not_after = Some(clock.now());
        // Exactly at both boundaries the license is still valid.
        assert!(validation.validate(&license).is_ok());

        clock.advance(Duration::seconds(1));
        let result = validation.validate(&license);
        assert!(matches!(
            result,
            Err(LicenseError::Validation(ValidationError::Expired { .. }))
        ));
    }

    #[test]
    fn not_yet_valid_before_the_window() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        let mut license = valid_license(&clock);
        license.not_before = Some(clock.now() + Duration::seconds(1));
        assert!(matches!(
            validation.validate(&license),
            Err(LicenseError::Validation(ValidationError::NotYetValid { .. }))
        ));
    }

    #[test]
    fn missing_window_means_perpetual() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        let license = valid_license(&clock);
        clock.advance(Duration::days(10_000));
        assert!(validation.validate(&license).is_ok());
    }

    #[test]
    fn rejects_nonpositive_consumer_amount() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        let mut license = valid_license(&clock);
        license.consumer_amount = 0;
        assert!(matches!(
            validation.validate(&license),
            Err(LicenseError::Validation(
                ValidationError::ConsumerAmountNotPositive(0)
            ))
        ));
    }

    #[test]
    fn rejects_missing_required_properties() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());

        let mut license = valid_license(&clock);
        license.consumer_type = None;
        assert!(validation.validate(&license).is_err());

        let mut license = valid_license(&clock);
        license.holder = None;
        assert!(validation.validate(&license).is_err());

        let mut license = valid_license(&clock);
        license.issued = None;
        assert!(validation.validate(&license).is_err());

        let mut license = valid_license(&clock);
        license.issuer = None;
        assert!(validation.validate(&license).is_err());
    }

    #[test]
    fn rejects_a_foreign_subject() {
        let clock = clock();
        let validation = StandardValidation::new("MyApp 1.X", clock.clone());
        let mut license = valid_license(&clock);
        license.subject = Some("OtherApp".to_string());
        assert!(matches!(
            validation.validate(&license),
            Err(LicenseError::Validation(ValidationError::SubjectMismatch { .. }))
        ));
    }
}
