//! On-disk storage for the encrypted fallback cache.
//!
//! The file is an opaque byte blob. Writes go to a temporary sibling that is
//! renamed over the target, so readers see either the old or the new record.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::{BootstrapError, BootstrapResult};

/// Reads and writes the fallback cache file, if one is configured.
#[derive(Debug, Clone, Default)]
pub struct FallbackStore {
    path: Option<PathBuf>,
}

impl FallbackStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replace the cache file with `blob`. Succeeds without touching the
    /// file system when no path is configured.
    pub fn write(&self, blob: &[u8]) -> BootstrapResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| BootstrapError::io(dir, e))?;
        tmp.write_all(blob)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| BootstrapError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| BootstrapError::io(path, e.error))?;

        debug!(path = %path.display(), bytes = blob.len(), "Wrote fallback file");
        Ok(())
    }

    /// Read the raw cache file. `Ok(None)` when no path is configured or the
    /// file does not exist.
    pub fn read(&self) -> BootstrapResult<Option<Vec<u8>>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };

        match std::fs::read(path) {
            Ok(bytes) => {
                debug!(path = %path.display(), bytes = bytes.len(), "Read fallback file");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BootstrapError::io(path, e)),
        }
    }
}
