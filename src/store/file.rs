//! File-based store with atomic writes.
//!
//! Uses temp file + rename so a crashed write never leaves a truncated
//! license key behind.

use crate::store::{Sink, Source, SourceId, Store};
use crate::LicenseError;
use std::fs;
use std::path::{Path, PathBuf};

/// A store persisting to a single file path.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    max_size: Option<u64>,
}

impl FileStore {
    /// Create a store at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: None,
        }
    }

    /// Create a store under the per-user data directory, e.g.
    /// `<data_dir>/<namespace>/<name>`. The directory is created if needed.
    pub fn in_data_dir(namespace: &str, name: &str) -> Result<Self, LicenseError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| LicenseError::Io("could not find data directory".to_string()))?;
        let dir = base_dir.join(namespace);
        fs::create_dir_all(&dir)
            .map_err(|e| LicenseError::Io(format!("failed to create store dir: {}", e)))?;
        Ok(Self::new(dir.join(name)))
    }

    /// Refuse to read files larger than `max_size` bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// The backing path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for FileStore {
    fn input(&self) -> Result<Vec<u8>, LicenseError> {
        if let Some(max) = self.max_size {
            let len = fs::metadata(&self.path)
                .map_err(|e| LicenseError::Io(format!("failed to stat store file: {}", e)))?
                .len();
            if len > max {
                return Err(LicenseError::Io(format!(
                    "store file is {} bytes, exceeding the maximum of {}",
                    len, max
                )));
            }
        }
        fs::read(&self.path).map_err(|e| LicenseError::Io(format!("failed to read store: {}", e)))
    }

    fn id(&self) -> SourceId {
        SourceId::new("file", self.path.to_string_lossy())
    }
}

impl Sink for FileStore {
    fn output(&self, data: &[u8]) -> Result<(), LicenseError> {
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, data)
            .map_err(|e| LicenseError::Io(format!("failed to write temp file: {}", e)))?;
        fs::rename(&temp_path, &self.path)
            .map_err(|e| LicenseError::Io(format!("failed to rename store file: {}", e)))
    }
}

impl Store for FileStore {
    fn delete(&self) -> Result<(), LicenseError> {
        fs::remove_file(&self.path)
            .map_err(|e| LicenseError::Io(format!("failed to delete store: {}", e)))
    }

    fn exists(&self) -> Result<bool, LicenseError> {
        Ok(self.path.exists())
    }
}
