//! # Keyward
//!
//! **Offline license-key lifecycle management with Ed25519-signed
//! repositories.**
//!
//! Keyward signs structured license artifacts into small persisted
//! "repository" envelopes and **cryptographically verifies** every envelope
//! before the license inside may be decoded and trusted. On top of that core
//! it drives the full consumer lifecycle against a persisted store.
//!
//! ## Features
//!
//! - **Ed25519 repository signatures** — the envelope pins the algorithm and
//!   carries the signature over the exact encoded artifact bytes
//! - **Keystore-bound authentication** — private keys live in a typed,
//!   password-digested keystore; verification needs the public key only
//! - **Install / load / verify / uninstall** — signature checks before any
//!   store mutation, with a time-boxed single-entry cache in front
//! - **Chained managers** — parent-first delegation with an optional
//!   free-trial-period license generated on the fly
//! - **Fail-closed security** — unsigned envelopes, algorithm mismatches and
//!   tampered bodies cause rejection, not bypass
//!
//! ## Quickstart
//!
//! ```no_run
//! use keyward::{
//!     FileStore, Keystore, KeystoreParameters, License, LicenseContext, MemoryStore,
//!     PlainPassword, Sink,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), keyward::LicenseError> {
//!     let context = LicenseContext::builder("MyApp 1.X").build()?;
//!
//!     // Consumer side: the keystore holds the vendor's public key only.
//!     let keystore = Keystore::create("store-password-1")
//!         .with_verifying_key("vendor", "d75a...511a");
//!     let source = MemoryStore::new();
//!     source.output(&keystore.to_bytes()?)?;
//!
//!     let manager = context
//!         .manager()
//!         .keystore(
//!             KeystoreParameters::new("vendor", PlainPassword::new("store-password-1"))
//!                 .load_from(Arc::new(source)),
//!         )
//!         .store(FileStore::in_data_dir("myapp", "license.key")?)
//!         .build()?;
//!
//!     manager.install(&FileStore::new("/tmp/license.key"))?;
//!     let license: License = manager.verify()?;
//!     println!("licensed to {}", license.holder.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Keyward protects against:
//! - **License tampering** — any change to the signed artifact or envelope is
//!   rejected (signature mismatch)
//! - **Algorithm confusion** — the stored algorithm name must match the
//!   verifying engine before any cryptography runs
//! - **Garbage installs** — a key is verified before it reaches the store
//!
//! Keyward does **not** prevent binary patching or code modification.
//! Client-side licensing can always be bypassed by a determined attacker
//! with access to the binary.
//!
//! ## Error reporting
//!
//! All operations return [`LicenseError`]. Validation failures describe the
//! license the user already holds and are safe to show; check
//! [`LicenseError::is_confidential`] before displaying anything else.

#![deny(warnings)]
#![deny(missing_docs)]
#![doc(html_root_url = "https://docs.rs/keyward/0.1.0")]

// Core modules
pub mod cache;
pub mod clock;
pub mod config;
pub mod errors;
pub mod license;

// Codec layer
pub mod codec;

// Crypto layer
pub mod crypto;

// Repository layer
pub mod repository;

// Persistence layer
pub mod store;
pub mod transform;

// Policy layer
pub mod policy;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use codec::json::JsonCodec;
pub use codec::Codec;
pub use config::{LicenseContext, LicenseContextBuilder, DEFAULT_CACHE_PERIOD};
pub use crypto::keystore::{
    DefaultPasswordPolicy, Keystore, KeystoreParameters, PasswordPolicy, PasswordProtection,
    PlainPassword, UncheckedPasswordPolicy,
};
pub use crypto::notary::Authentication;
pub use errors::{LicenseError, ValidationError};
pub use license::License;
pub use manager::{LicenseKeyGenerator, LicenseManager, ManagerBuilder};
pub use policy::{LicenseInitialization, LicenseValidation};
pub use repository::{Decoder, RepositoryController, RepositoryModel};
pub use store::{FileStore, MemoryStore, Sink, Source, SourceId, Store};
pub use transform::{Identity, Transformation};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
