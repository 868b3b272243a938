//! Context configuration: everything a set of license managers shares.

use crate::clock::{Clock, SystemClock};
use crate::codec::json::JsonCodec;
use crate::codec::Codec;
use crate::crypto::keystore::{DefaultPasswordPolicy, PasswordPolicy};
use crate::manager::ManagerBuilder;
use crate::policy::{LicenseInitialization, LicenseValidation};
use crate::transform::{Identity, Transformation};
use crate::LicenseError;
use std::sync::Arc;
use std::time::Duration;

/// How long managers cache installed license keys and decoded licenses.
pub const DEFAULT_CACHE_PERIOD: Duration = Duration::from_secs(30 * 60);

/// Shared configuration for all license managers of one product.
///
/// Carries the management subject, the clock, the codec, the transformation
/// applied between repository and store, the password policy and the cache
/// period. Cheap to clone.
#[derive(Clone)]
pub struct LicenseContext<C: Codec = JsonCodec> {
    pub(crate) subject: String,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) codec: C,
    pub(crate) transformation: Arc<dyn Transformation>,
    pub(crate) password_policy: Arc<dyn PasswordPolicy>,
    pub(crate) cache_period: Duration,
    pub(crate) initialization: Option<Arc<dyn LicenseInitialization>>,
    pub(crate) validation: Option<Arc<dyn LicenseValidation>>,
}

impl LicenseContext<JsonCodec> {
    /// Start building a context for the given management subject.
    pub fn builder(subject: impl Into<String>) -> LicenseContextBuilder<JsonCodec> {
        LicenseContextBuilder {
            subject: subject.into(),
            clock: Arc::new(SystemClock),
            codec: JsonCodec,
            transformation: Arc::new(Identity),
            password_policy: Arc::new(DefaultPasswordPolicy),
            cache_period: DEFAULT_CACHE_PERIOD,
            initialization: None,
            validation: None,
        }
    }
}

impl<C: Codec> LicenseContext<C> {
    /// The license management subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Start building a license manager on top of this context.
    pub fn manager(&self) -> ManagerBuilder<C> {
        ManagerBuilder::new(self.clone())
    }
}

/// Builds a [`LicenseContext`].
pub struct LicenseContextBuilder<C: Codec = JsonCodec> {
    subject: String,
    clock: Arc<dyn Clock>,
    codec: C,
    transformation: Arc<dyn Transformation>,
    password_policy: Arc<dyn PasswordPolicy>,
    cache_period: Duration,
    initialization: Option<Arc<dyn LicenseInitialization>>,
    validation: Option<Arc<dyn LicenseValidation>>,
}

impl<C: Codec> LicenseContextBuilder<C> {
    /// Replace the codec used to encode licenses and repository envelopes.
    pub fn codec<D: Codec>(self, codec: D) -> LicenseContextBuilder<D> {
        LicenseContextBuilder {
            subject: self.subject,
            clock: self.clock,
            codec,
            transformation: self.transformation,
            password_policy: self.password_policy,
            cache_period: self.cache_period,
            initialization: self.initialization,
            validation: self.validation,
        }
    }

    /// Replace the clock. Mainly useful for tests.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply a transformation to license keys between repository and store.
    pub fn transformation(mut self, transformation: Arc<dyn Transformation>) -> Self {
        self.transformation = transformation;
        self
    }

    /// Replace the password policy applied to private key passwords.
    pub fn password_policy(mut self, policy: Arc<dyn PasswordPolicy>) -> Self {
        self.password_policy = policy;
        self
    }

    /// How long managers cache license keys and decoded licenses. A zero
    /// period disables caching.
    pub fn cache_period(mut self, period: Duration) -> Self {
        self.cache_period = period;
        self
    }

    /// Custom initialization, run before the built-in one.
    pub fn initialization(mut self, initialization: Arc<dyn LicenseInitialization>) -> Self {
        self.initialization = Some(initialization);
        self
    }

    /// Custom validation, run before the built-in one.
    pub fn validation(mut self, validation: Arc<dyn LicenseValidation>) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Finish the context. Fails when the subject is empty.
    pub fn build(self) -> Result<LicenseContext<C>, LicenseError> {
        if self.subject.is_empty() {
            return Err(LicenseError::Config(
                "license management subject must not be empty".to_string(),
            ));
        }
        Ok(LicenseContext {
            subject: self.subject,
            clock: self.clock,
            codec: self.codec,
            transformation: self.transformation,
            password_policy: self.password_policy,
            cache_period: self.cache_period,
            initialization: self.initialization,
            validation: self.validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let context = LicenseContext::builder("MyApp 1.X").build().unwrap();
        assert_eq!(context.subject(), "MyApp 1.X");
        assert_eq!(context.cache_period, DEFAULT_CACHE_PERIOD);
        assert!(context.initialization.is_none());
        assert!(context.validation.is_none());
    }

    #[test]
    fn empty_subject_is_a_config_error() {
        let result = LicenseContext::builder("").build();
        assert!(matches!(result, Err(LicenseError::Config(_))));
    }

    #[test]
    fn cache_period_is_configurable() {
        let context = LicenseContext::builder("MyApp 1.X")
            .cache_period(Duration::ZERO)
            .build()
            .unwrap();
        assert_eq!(context.cache_period, Duration::ZERO);
    }
}
