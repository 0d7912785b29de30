//! Durable directory-backed backend
//!
//! Each key is stored as one file in a base directory. Values survive process
//! restarts. Writes go through a temporary file and a rename so a crash never
//! leaves a half-written slot behind.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BackendError;

use super::Backend;

/// Default quota for the durable backend: 10 MiB
pub const DEFAULT_DURABLE_QUOTA: usize = 10 * 1024 * 1024;

const SLOT_EXTENSION: &str = "slot";
const TEMP_EXTENSION: &str = "tmp";
/// Keeps file names non-empty so the empty key still gets a `.slot` extension
const SLOT_PREFIX: &str = "k_";

/// Backend persisting each key as a file under a directory
#[derive(Debug, Clone)]
pub struct DurableBackend {
    base_path: PathBuf,
    quota: usize,
}

impl DurableBackend {
    /// Open (creating if needed) a durable backend with the default quota
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        Self::with_quota(base_path, DEFAULT_DURABLE_QUOTA)
    }

    /// Open a durable backend with a custom quota in bytes
    pub fn with_quota(base_path: impl Into<PathBuf>, quota: usize) -> Result<Self, BackendError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        tracing::debug!(path = %base_path.display(), quota, "Opened durable backend");
        Ok(Self { base_path, quota })
    }

    /// Directory holding the slots
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!(
            "{}{}.{}",
            SLOT_PREFIX,
            urlencoding::encode(key),
            SLOT_EXTENSION
        ))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!(
            "{}{}.{}",
            SLOT_PREFIX,
            urlencoding::encode(key),
            TEMP_EXTENSION
        ))
    }

    /// Bytes charged against the quota: key plus value for every slot
    pub fn usage(&self) -> Result<usize, BackendError> {
        let mut used = 0;
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SLOT_EXTENSION) {
                continue;
            }
            let key_len = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(SLOT_PREFIX))
                .and_then(|s| urlencoding::decode(s).ok())
                .map_or(0, |k| k.len());
            used += key_len + fs::metadata(&path)?.len() as usize;
        }
        Ok(used)
    }

    fn slot_size(&self, key: &str) -> Result<usize, BackendError> {
        match fs::metadata(self.slot_path(key)) {
            Ok(meta) => Ok(key.len() + meta.len() as usize),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl Backend for DurableBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        match fs::read(self.slot_path(key)) {
            Ok(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), BackendError> {
        let base = self.usage()?.saturating_sub(self.slot_size(key)?);
        let needed = key.len() + value.len();
        if base + needed > self.quota {
            return Err(BackendError::QuotaExceeded {
                needed,
                available: self.quota.saturating_sub(base),
            });
        }

        let temp = self.temp_path(key);
        fs::write(&temp, value)?;
        fs::rename(&temp, self.slot_path(key))?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), BackendError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn quota_hint(&self) -> Option<usize> {
        Some(self.quota)
    }
}
