use crate::clock::Clock;
use crate::license::License;
use crate::policy::LicenseInitialization;
use crate::LicenseError;
use std::sync::Arc;

/// Built-in initialization: fills every required property that is still
/// unset with its conventional default.
///
/// Runs on the vendor side right before a license key gets generated, so a
/// caller only has to set what differs from the defaults.
#[derive(Clone)]
pub struct StandardInitialization {
    subject: String,
    clock: Arc<dyn Clock>,
}

impl StandardInitialization {
    /// Bind the management subject and the clock used for `issued`.
    pub fn new(subject: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            subject: subject.into(),
            clock,
        }
    }
}

impl LicenseInitialization for StandardInitialization {
    fn initialize(&self, license: &mut License) -> Result<(), LicenseError> {
        if license.consumer_amount == 0 {
            license.consumer_amount = 1;
        }
        if license.consumer_type.is_none() {
            license.consumer_type = Some("User".to_string());
        }
        if license.holder.is_none() {
            license.holder = Some("CN=Unknown".to_string());
        }
        if license.issued.is_none() {
            license.issued = Some(self.clock.now());
        }
        if license.issuer.is_none() {
            license.issuer = Some(format!("CN={}", self.subject));
        }
        if license.subject.is_none() {
            license.subject = Some(self.subject.clone());
        }
        Ok(())
    }
}
