//! License managers: the state machine driving install, load, verify,
//! uninstall and key generation against a persisted store.
//!
//! A manager without a parent works the local store directly, with a
//! single-entry cache in front of signature verification. A manager with a
//! parent delegates every operation to the parent first and falls back
//! locally on failure; configured with a free trial period it can generate
//! and install a trial license on the fly when nothing else is available.

use crate::cache::Cache;
use crate::codec::Codec;
use crate::config::LicenseContext;
use crate::crypto::keystore::KeystoreParameters;
use crate::crypto::notary::Authentication;
use crate::license::License;
use crate::policy::{
    LicenseInitialization, LicenseValidation, StandardInitialization, StandardValidation,
};
use crate::repository::{Decoder, RepositoryController, RepositoryModel};
use crate::store::{MemoryStore, Sink, Source, SourceId, Store};
use crate::transform::Transformation;
use crate::LicenseError;
use chrono::Duration as ChronoDuration;
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned cache or store lock only means a previous operation
    // panicked; the protected state is still usable.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Generates one license key from a validated license bean.
///
/// Obtained from [`LicenseManager::generate_key_from`]. The artifact is
/// already signed; saving only encodes the repository envelope and runs the
/// configured transformation.
pub struct LicenseKeyGenerator<C: Codec> {
    codec: C,
    transformation: Arc<dyn Transformation>,
    model: RepositoryModel,
    decoder: Decoder<C>,
}

impl<C: Codec> LicenseKeyGenerator<C> {
    /// The license as it was signed, with all defaults filled in.
    pub fn license(&self) -> Result<License, LicenseError> {
        self.decoder.decode()
    }

    /// Write the license key to a sink. Can be called any number of times.
    pub fn save_to<S: Sink + ?Sized>(&self, sink: &S) -> Result<&Self, LicenseError> {
        let encoded = self.codec.encode(&self.model)?;
        let data = self.transformation.forward(encoded)?;
        sink.output(&data)?;
        Ok(self)
    }
}

/// A license manager bound to one store and one keystore entry.
///
/// Thread-safe: operations on the store are serialized by an internal lock,
/// cache reads are optimistic with a locked retry on miss.
pub struct LicenseManager<C: Codec> {
    context: LicenseContext<C>,
    authentication: Authentication,
    store: Arc<dyn Store>,
    parent: Option<Arc<LicenseManager<C>>>,
    ftp_days: u32,
    initialization: StandardInitialization,
    validation: StandardValidation,
    store_lock: Mutex<()>,
    cached_decoder: Mutex<Cache<SourceId, Decoder<C>>>,
    cached_license: Mutex<Cache<SourceId, License>>,
    can_generate: OnceCell<bool>,
}

impl<C: Codec> LicenseManager<C> {
    /// Generate a license key from the given bean.
    ///
    /// The bean itself is never modified. A duplicate gets initialized with
    /// the configured defaults, validated and signed. Requires access to the
    /// private key of the configured keystore entry.
    pub fn generate_key_from(&self, bean: &License) -> Result<LicenseKeyGenerator<C>, LicenseError> {
        debug!(subject = %self.context.subject, "generating license key");
        let mut license = bean.clone();
        self.initialize(&mut license)?;
        self.validate(&license)?;
        let mut model = RepositoryModel::new();
        let decoder = self.authentication.sign(
            &mut RepositoryController::new(&self.context.codec, &mut model),
            &license,
        )?;
        Ok(LicenseKeyGenerator {
            codec: self.context.codec.clone(),
            transformation: self.context.transformation.clone(),
            model,
            decoder,
        })
    }

    /// Install a license key from the given source into the managed store.
    ///
    /// The key's signature is verified before anything is written, so a
    /// tampered or garbage key never reaches the store. With a parent
    /// configured the key is installed into the parent instead; the local
    /// fallback is reserved for managers which cannot generate keys
    /// themselves.
    pub fn install<S: Source + ?Sized>(&self, source: &S) -> Result<(), LicenseError> {
        match &self.parent {
            None => self.install_here(source),
            Some(parent) => match parent.install(source) {
                Ok(()) => Ok(()),
                Err(first) => {
                    if self.can_generate_license_keys() {
                        return Err(first);
                    }
                    warn!(subject = %self.context.subject, error = %first,
                        "parent install failed, installing locally");
                    self.install_here(source)
                }
            },
        }
    }

    /// Load the installed license.
    ///
    /// With a parent configured, tries the parent first, then the local
    /// store, then retries under the store lock, and finally generates a
    /// free trial period license if so configured and nothing is installed.
    pub fn load(&self) -> Result<License, LicenseError> {
        let parent = match &self.parent {
            None => return self.load_here(),
            Some(parent) => parent,
        };
        match parent.load() {
            Ok(license) => Ok(license),
            Err(first) => {
                debug!(subject = %self.context.subject, error = %first,
                    "parent load failed, falling back to local store");
                match self.load_here() {
                    Ok(license) => Ok(license),
                    Err(_second) => {
                        let _guard = lock(&self.store_lock);
                        match self.load_here_locked() {
                            Ok(license) => Ok(license),
                            Err(third) => self.generate_iff_new_ftp(third)?.license(),
                        }
                    }
                }
            }
        }
    }

    /// Load and validate the installed license.
    ///
    /// Chains like [`load`](Self::load); a freshly generated trial license
    /// counts as verified.
    pub fn verify(&self) -> Result<License, LicenseError> {
        let parent = match &self.parent {
            None => return self.verify_here(),
            Some(parent) => parent,
        };
        match parent.verify() {
            Ok(license) => Ok(license),
            Err(first) => {
                debug!(subject = %self.context.subject, error = %first,
                    "parent verify failed, falling back to local store");
                match self.verify_here() {
                    Ok(license) => Ok(license),
                    Err(_second) => {
                        let _guard = lock(&self.store_lock);
                        match self.verify_here_locked() {
                            Ok(license) => Ok(license),
                            Err(third) => self.generate_iff_new_ftp(third)?.license(),
                        }
                    }
                }
            }
        }
    }

    /// Uninstall the installed license key.
    ///
    /// The installed key must still authenticate before it gets deleted.
    /// With a parent configured the parent is uninstalled instead; like
    /// install, the local fallback is reserved for managers which cannot
    /// generate keys themselves.
    pub fn uninstall(&self) -> Result<(), LicenseError> {
        match &self.parent {
            None => self.uninstall_here(),
            Some(parent) => match parent.uninstall() {
                Ok(()) => Ok(()),
                Err(first) => {
                    if self.can_generate_license_keys() {
                        return Err(first);
                    }
                    warn!(subject = %self.context.subject, error = %first,
                        "parent uninstall failed, uninstalling locally");
                    self.uninstall_here()
                }
            },
        }
    }

    fn install_here<S: Source + ?Sized>(&self, source: &S) -> Result<(), LicenseError> {
        debug!(subject = %self.context.subject, "installing license key");
        let source_id = source.id();
        let key = source.input()?;
        let _guard = lock(&self.store_lock);
        let decoder = self.authenticate(source_id.clone(), || Ok(key.clone()))?;
        let license: License = decoder.decode()?;
        self.store.output(&key)?;

        // Rebind both caches from the source to the store, keeping the just
        // verified objects, so the next load hits without re-authenticating.
        let now = self.context.clock.now();
        let store_id = self.store.id();
        {
            let mut cached = lock(&self.cached_license);
            *cached = Cache::new(source_id, license, self.context.cache_period, now)
                .with_key(store_id.clone(), now);
        }
        {
            let mut cached = lock(&self.cached_decoder);
            let rebound = std::mem::replace(&mut *cached, Cache::empty());
            *cached = rebound.with_key(store_id, now);
        }
        Ok(())
    }

    fn load_here(&self) -> Result<License, LicenseError> {
        let now = self.context.clock.now();
        let store_id = self.store.id();
        if let Some(license) = lock(&self.cached_license).lookup(&store_id, now) {
            return Ok(license);
        }
        let _guard = lock(&self.store_lock);
        self.load_here_locked()
    }

    fn load_here_locked(&self) -> Result<License, LicenseError> {
        let now = self.context.clock.now();
        let store_id = self.store.id();
        if let Some(license) = lock(&self.cached_license).lookup(&store_id, now) {
            return Ok(license);
        }
        debug!(subject = %self.context.subject, "loading license key from store");
        let decoder = self.authenticate(store_id.clone(), || self.store.input())?;
        let license: License = decoder.decode()?;
        *lock(&self.cached_license) =
            Cache::new(store_id, license.clone(), self.context.cache_period, now);
        Ok(license)
    }

    fn verify_here(&self) -> Result<License, LicenseError> {
        let license = self.load_here()?;
        self.validate(&license)?;
        Ok(license)
    }

    fn verify_here_locked(&self) -> Result<License, LicenseError> {
        let license = self.load_here_locked()?;
        self.validate(&license)?;
        Ok(license)
    }

    fn uninstall_here(&self) -> Result<(), LicenseError> {
        debug!(subject = %self.context.subject, "uninstalling license key");
        let _guard = lock(&self.store_lock);
        // The installed key must authenticate before it may be deleted.
        self.authenticate(self.store.id(), || self.store.input())?;
        self.store.delete()?;
        *lock(&self.cached_decoder) = Cache::empty();
        *lock(&self.cached_license) = Cache::empty();
        Ok(())
    }

    /// Verify a repository envelope read from `input`, with a cache in front
    /// keyed by the source identity. On a hit `input` is never called.
    fn authenticate(
        &self,
        key_id: SourceId,
        input: impl FnOnce() -> Result<Vec<u8>, LicenseError>,
    ) -> Result<Decoder<C>, LicenseError> {
        let now = self.context.clock.now();
        if let Some(decoder) = lock(&self.cached_decoder).lookup(&key_id, now) {
            return Ok(decoder);
        }
        let data = self.context.transformation.backward(input()?)?;
        let mut model: RepositoryModel = self.context.codec.decode(&data)?;
        let decoder = self
            .authentication
            .verify(&RepositoryController::new(&self.context.codec, &mut model))?;
        *lock(&self.cached_decoder) =
            Cache::new(key_id, decoder.clone(), self.context.cache_period, now);
        Ok(decoder)
    }

    /// Whether this manager holds a private key it can actually sign with.
    ///
    /// Probed once by signing a throwaway license into a discard sink; the
    /// result is cached for the life of the manager so a consumer-only
    /// deployment does not retry failed generation on every call.
    fn can_generate_license_keys(&self) -> bool {
        *self.can_generate.get_or_init(|| {
            let probe = self
                .generate_key_from(&License::new())
                .and_then(|generator| generator.save_to(&MemoryStore::new()).map(|_| ()));
            match probe {
                Ok(()) => true,
                Err(error) => {
                    debug!(subject = %self.context.subject, %error,
                        "this manager cannot generate license keys");
                    false
                }
            }
        })
    }

    /// Generate and install a free trial period license, unless this manager
    /// cannot generate keys or a license key is already installed, in which
    /// case the original error is re-raised. Caller holds the store lock.
    fn generate_iff_new_ftp(
        &self,
        error: LicenseError,
    ) -> Result<LicenseKeyGenerator<C>, LicenseError> {
        if !self.can_generate_license_keys() {
            return Err(error);
        }
        if self.store.exists()? {
            return Err(error);
        }
        warn!(subject = %self.context.subject, ftp_days = self.ftp_days,
            "generating free trial period license");
        let generator = self.generate_key_from(&License::new())?;
        generator.save_to(self.store.as_ref())?;
        Ok(generator)
    }

    fn initialize(&self, license: &mut License) -> Result<(), LicenseError> {
        if let Some(custom) = &self.context.initialization {
            custom.initialize(license)?;
        }
        self.initialization.initialize(license)?;
        if self.ftp_days != 0 {
            // The trial countdown starts now: the window opens at the issue
            // instant and closes ftp_days later.
            let issued = license.issued.ok_or_else(|| {
                LicenseError::Config("initialization left issued unset".to_string())
            })?;
            license.not_before = Some(issued);
            license.not_after = Some(issued + ChronoDuration::days(i64::from(self.ftp_days)));
        }
        Ok(())
    }

    fn validate(&self, license: &License) -> Result<(), LicenseError> {
        if let Some(custom) = &self.context.validation {
            custom.validate(license)?;
        }
        self.validation.validate(license)
    }
}

/// Builds a [`LicenseManager`] on top of a [`LicenseContext`].
pub struct ManagerBuilder<C: Codec> {
    context: LicenseContext<C>,
    parameters: Option<KeystoreParameters>,
    store: Option<Arc<dyn Store>>,
    parent: Option<Arc<LicenseManager<C>>>,
    ftp_days: u32,
}

impl<C: Codec> ManagerBuilder<C> {
    pub(crate) fn new(context: LicenseContext<C>) -> Self {
        Self {
            context,
            parameters: None,
            store: None,
            parent: None,
            ftp_days: 0,
        }
    }

    /// The keystore entry used to sign or verify license keys. Required.
    pub fn keystore(mut self, parameters: KeystoreParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// The store holding the installed license key. Required.
    pub fn store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Like [`store`](Self::store) for an already shared store.
    pub fn shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// A parent manager consulted before the local store on every operation.
    pub fn parent(mut self, parent: Arc<LicenseManager<C>>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Free trial period in days. Requires a parent; zero disables it.
    pub fn ftp_days(mut self, days: u32) -> Self {
        self.ftp_days = days;
        self
    }

    /// Finish the manager.
    pub fn build(self) -> Result<LicenseManager<C>, LicenseError> {
        let parameters = self
            .parameters
            .ok_or_else(|| LicenseError::Config("keystore parameters are required".to_string()))?;
        let store = self
            .store
            .ok_or_else(|| LicenseError::Config("a license key store is required".to_string()))?;
        if self.ftp_days != 0 && self.parent.is_none() {
            return Err(LicenseError::Config(
                "a free trial period requires a parent manager".to_string(),
            ));
        }
        let context = self.context;
        let authentication =
            Authentication::new(parameters, context.password_policy.clone());
        let initialization =
            StandardInitialization::new(context.subject.clone(), context.clock.clone());
        let validation = StandardValidation::new(context.subject.clone(), context.clock.clone());
        Ok(LicenseManager {
            context,
            authentication,
            store,
            parent: self.parent,
            ftp_days: self.ftp_days,
            initialization,
            validation,
            store_lock: Mutex::new(()),
            cached_decoder: Mutex::new(Cache::empty()),
            cached_license: Mutex::new(Cache::empty()),
            can_generate: OnceCell::new(),
        })
    }
}
