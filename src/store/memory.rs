//! In-memory store, used for tests and as the discard sink for the
//! capability probe of chained managers.

use crate::store::{Sink, Source, SourceId, Store};
use crate::LicenseError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// An in-memory byte slot.
///
/// Clones share the same slot and compare equal by [`SourceId`].
#[derive(Debug, Clone)]
pub struct MemoryStore {
    id: u64,
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a fresh, empty memory store with a unique identity.
    pub fn new() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>, LicenseError> {
        self.slot
            .lock()
            .map_err(|_| LicenseError::Io("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for MemoryStore {
    fn input(&self) -> Result<Vec<u8>, LicenseError> {
        self.lock()?
            .clone()
            .ok_or_else(|| LicenseError::Io("memory store is empty".to_string()))
    }

    fn id(&self) -> SourceId {
        SourceId::new("memory", self.id.to_string())
    }
}

impl Sink for MemoryStore {
    fn output(&self, data: &[u8]) -> Result<(), LicenseError> {
        *self.lock()? = Some(data.to_vec());
        Ok(())
    }
}

impl Store for MemoryStore {
    fn delete(&self) -> Result<(), LicenseError> {
        self.lock()?
            .take()
            .map(|_| ())
            .ok_or_else(|| LicenseError::Io("memory store is empty".to_string()))
    }

    fn exists(&self) -> Result<bool, LicenseError> {
        Ok(self.lock()?.is_some())
    }
}
