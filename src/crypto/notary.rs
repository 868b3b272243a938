//! Authentication: binds keystore parameters to a repository controller.
//!
//! Signs or verifies a generic artifact using the private or public key of
//! one keystore entry.

use crate::codec::Codec;
use crate::crypto::engine::{Ed25519Signer, Ed25519Verifier, ED25519};
use crate::crypto::keystore::{Keystore, KeystoreParameters, PasswordPolicy};
use crate::repository::{Decoder, RepositoryController};
use crate::LicenseError;
use serde::Serialize;
use std::sync::Arc;

/// Signs and verifies artifacts at the repository level using a keystore
/// entry addressed by [`KeystoreParameters`].
///
/// All keystore failures (unreadable store, unknown alias, wrong password,
/// password-policy rejection) surface as
/// [`LicenseError::Authentication`], never silently downgraded.
#[derive(Clone)]
pub struct Authentication {
    parameters: KeystoreParameters,
    policy: Arc<dyn PasswordPolicy>,
}

impl Authentication {
    /// Bind keystore parameters and a password policy.
    pub fn new(parameters: KeystoreParameters, policy: Arc<dyn PasswordPolicy>) -> Self {
        Self { parameters, policy }
    }

    /// Sign the artifact into the controller's model using the entry's
    /// private key. Mutates the underlying repository model.
    pub fn sign<C: Codec, T: Serialize>(
        &self,
        controller: &mut RepositoryController<'_, C>,
        artifact: &T,
    ) -> Result<Decoder<C>, LicenseError> {
        let keystore = self.keystore()?;
        self.check_algorithm(&keystore)?;
        // Policy applies to private key access only.
        let key_password = self.parameters.key_password()?;
        self.policy.check(&key_password)?;
        let seed_hex = keystore.signing_key_hex(&self.parameters.alias, &key_password)?;
        let engine = Ed25519Signer::from_hex(seed_hex)?;
        controller.sign(&engine, artifact)
    }

    /// Verify the controller's model using the entry's public key. Does not
    /// mutate state.
    pub fn verify<C: Codec>(
        &self,
        controller: &RepositoryController<'_, C>,
    ) -> Result<Decoder<C>, LicenseError> {
        let keystore = self.keystore()?;
        self.check_algorithm(&keystore)?;
        let key_hex = keystore.verifying_key_hex(&self.parameters.alias)?;
        let engine = Ed25519Verifier::from_hex(key_hex)?;
        controller.verify(&engine)
    }

    fn keystore(&self) -> Result<Keystore, LicenseError> {
        let store_password = self.parameters.store_protection.password()?;
        match &self.parameters.source {
            Some(source) => {
                let data = source.input().map_err(|e| {
                    LicenseError::Authentication(format!("keystore load failure: {}", e))
                })?;
                Keystore::from_bytes(&data, &self.parameters.store_type, &store_password)
            }
            None => Ok(Keystore::create(&store_password)),
        }
    }

    /// Resolve the effective algorithm: the configured override or, absent
    /// that, the one recorded on the keystore entry. Only Ed25519 engines
    /// are shipped.
    fn check_algorithm(&self, keystore: &Keystore) -> Result<(), LicenseError> {
        let algorithm = match &self.parameters.algorithm {
            Some(algorithm) => algorithm.as_str(),
            None => keystore.algorithm(&self.parameters.alias)?,
        };
        if algorithm.eq_ignore_ascii_case(ED25519) {
            Ok(())
        } else {
            Err(LicenseError::Authentication(format!(
                "unsupported signature algorithm: {:?}",
                algorithm
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::json::JsonCodec;
    use crate::crypto::keystore::{DefaultPasswordPolicy, PlainPassword, UncheckedPasswordPolicy};
    use crate::repository::RepositoryModel;
    use crate::store::{MemoryStore, Sink};
    use serde::Deserialize;

    const TEST_SEED: [u8; 32] = [
        0x9d, 0x61, 0xb1, 0x9d, 0xef, 0xfd, 0x5a, 0x60, 0xba, 0x84, 0x4a, 0xf4, 0x92, 0xec, 0x2c,
        0xc4, 0x44, 0x49, 0xc5, 0x69, 0x7b, 0x32, 0x69, 0x19, 0x70, 0x3b, 0xac, 0x03, 0x1c, 0xae,
        0x7f, 0x60,
    ];

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Artifact {
        info: String,
    }

    fn keystore_source(keystore: &Keystore) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.output(&keystore.to_bytes().unwrap()).unwrap();
        Arc::new(store)
    }

    fn vendor_auth() -> Authentication {
        let keystore =
            Keystore::create("store-pw-1").with_key_pair("vendor", &TEST_SEED, Some("key-pw-22"));
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"))
            .key_protection(PlainPassword::new("key-pw-22"))
            .load_from(keystore_source(&keystore));
        Authentication::new(parameters, Arc::new(DefaultPasswordPolicy))
    }

    fn consumer_auth() -> Authentication {
        let signer = Ed25519Signer::from_seed(&TEST_SEED);
        let keystore =
            Keystore::create("store-pw-1").with_verifying_key("vendor", &signer.verifying_key_hex());
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"))
            .load_from(keystore_source(&keystore));
        Authentication::new(parameters, Arc::new(DefaultPasswordPolicy))
    }

    #[test]
    fn vendor_signs_consumer_verifies() {
        let codec = JsonCodec;
        let artifact = Artifact {
            info: "trial".to_string(),
        };
        let mut model = RepositoryModel::new();
        vendor_auth()
            .sign(&mut RepositoryController::new(&codec, &mut model), &artifact)
            .unwrap();

        let decoder = consumer_auth()
            .verify(&RepositoryController::new(&codec, &mut model.clone()))
            .unwrap();
        assert_eq!(decoder.decode::<Artifact>().unwrap(), artifact);
    }

    #[test]
    fn consumer_cannot_sign() {
        let codec = JsonCodec;
        let mut model = RepositoryModel::new();
        let result = consumer_auth().sign(
            &mut RepositoryController::new(&codec, &mut model),
            &Artifact {
                info: "trial".to_string(),
            },
        );
        assert!(matches!(result, Err(LicenseError::Authentication(_))));
    }

    #[test]
    fn password_policy_rejects_weak_key_password() {
        let keystore =
            Keystore::create("store-pw-1").with_key_pair("vendor", &TEST_SEED, Some("weak"));
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"))
            .key_protection(PlainPassword::new("weak"))
            .load_from(keystore_source(&keystore));
        let auth = Authentication::new(parameters, Arc::new(DefaultPasswordPolicy));

        let codec = JsonCodec;
        let mut model = RepositoryModel::new();
        let result = auth.sign(
            &mut RepositoryController::new(&codec, &mut model),
            &Artifact {
                info: "x".to_string(),
            },
        );
        assert!(matches!(result, Err(LicenseError::Authentication(_))));

        // An unchecked policy lets the same keystore through.
        let keystore =
            Keystore::create("store-pw-1").with_key_pair("vendor", &TEST_SEED, Some("weak"));
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"))
            .key_protection(PlainPassword::new("weak"))
            .load_from(keystore_source(&keystore));
        let auth = Authentication::new(parameters, Arc::new(UncheckedPasswordPolicy));
        let mut model = RepositoryModel::new();
        assert!(auth
            .sign(
                &mut RepositoryController::new(&codec, &mut model),
                &Artifact {
                    info: "x".to_string(),
                },
            )
            .is_ok());
    }

    #[test]
    fn missing_source_means_empty_keystore() {
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"));
        let auth = Authentication::new(parameters, Arc::new(DefaultPasswordPolicy));
        let codec = JsonCodec;
        let mut model = RepositoryModel::new();
        let result = auth.verify(&RepositoryController::new(&codec, &mut model));
        assert!(matches!(result, Err(LicenseError::Authentication(_))));
    }

    #[test]
    fn algorithm_override_must_be_supported() {
        let keystore =
            Keystore::create("store-pw-1").with_key_pair("vendor", &TEST_SEED, None);
        let parameters = KeystoreParameters::new("vendor", PlainPassword::new("store-pw-1"))
            .algorithm("SHA1withDSA")
            .load_from(keystore_source(&keystore));
        let auth = Authentication::new(parameters, Arc::new(UncheckedPasswordPolicy));
        let codec = JsonCodec;
        let mut model = RepositoryModel::new();
        let result = auth.sign(
            &mut RepositoryController::new(&codec, &mut model),
            &Artifact {
                info: "x".to_string(),
            },
        );
        assert!(matches!(result, Err(LicenseError::Authentication(_))));
    }
}
