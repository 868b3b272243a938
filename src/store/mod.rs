//! Store boundary: byte-stream access to named persisted locations.
//!
//! No format is imposed here; whatever the codec produces is what gets
//! persisted through a [`Store`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::LicenseError;

/// Identity of a source, used as the cache key by the license managers.
///
/// Two sources compare equal iff they address the same persisted location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(pub(crate) String);

impl SourceId {
    /// Create a source identity from a scheme and a location.
    pub fn new(scheme: &str, location: impl AsRef<str>) -> Self {
        Self(format!("{}:{}", scheme, location.as_ref()))
    }
}

/// A readable persisted location.
pub trait Source: Send + Sync {
    /// Read the complete content.
    fn input(&self) -> Result<Vec<u8>, LicenseError>;

    /// The identity of this location.
    fn id(&self) -> SourceId;
}

/// A writable persisted location.
pub trait Sink: Send + Sync {
    /// Replace the complete content.
    fn output(&self, data: &[u8]) -> Result<(), LicenseError>;
}

/// A named persisted location with full lifecycle access.
pub trait Store: Source + Sink {
    /// Delete the content. Fails if nothing is stored.
    fn delete(&self) -> Result<(), LicenseError>;

    /// Whether any content is stored.
    fn exists(&self) -> Result<bool, LicenseError>;
}
