//! Cryptographic layer: signature engines, keystore access and the
//! authentication facade binding them to repository controllers.

pub mod engine;
pub mod keystore;
pub mod notary;
