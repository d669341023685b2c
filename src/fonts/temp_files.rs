//! Scoped storage for extracted font files.
//!
//! Every file written here gets a unique `pdffont-XXXXXXXX.ttf` name created
//! with an exclusive-create open, so an attacker-placed file or symlink under
//! the same name makes creation retry instead of writing through it. Files
//! are recorded as they are persisted and deleted when the area is dropped.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::sfnt::ExtractError;

/// File name prefix of extracted fonts.
pub const FILE_PREFIX: &str = "pdffont-";
/// File name extension of extracted fonts.
pub const FILE_SUFFIX: &str = ".ttf";
const RANDOM_LEN: usize = 8;

/// Directory plus the list of files this process created in it.
#[derive(Debug)]
pub struct TempFontArea {
    dir: PathBuf,
    files: Mutex<Vec<PathBuf>>,
}

impl TempFontArea {
    /// Use `dir` for extracted fonts. The directory must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Mutex::new(Vec::new()),
        }
    }

    /// Use the system temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// Directory files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` to a new file and register it for cleanup.
    pub fn persist(&self, bytes: &[u8]) -> Result<PathBuf, ExtractError> {
        self.persist_with(|file| file.write_all(bytes))
    }

    /// Create a new file, fill it through `write`, and register it.
    ///
    /// If `write` or any later step fails, the file is removed before the
    /// error is returned.
    pub fn persist_with<F>(&self, write: F) -> Result<PathBuf, ExtractError>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let mut tmp = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .rand_bytes(RANDOM_LEN)
            .tempfile_in(&self.dir)?;

        // On error `tmp` is dropped here, which unlinks the partial file
        write(tmp.as_file_mut())?;
        tmp.as_file().sync_all()?;

        let (_, path) = tmp.keep().map_err(|e| ExtractError::WriteError(e.error))?;
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.clone());
        Ok(path)
    }

    /// Files currently registered.
    pub fn files(&self) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Delete every registered file, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        let files = std::mem::take(&mut *self.files.lock().unwrap_or_else(PoisonError::into_inner));
        let mut removed = 0;
        for path in files {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => log::warn!("Failed to remove temporary font {}: {}", path.display(), e),
            }
        }
        removed
    }
}

impl Drop for TempFontArea {
    fn drop(&mut self) {
        let removed = self.cleanup();
        if removed > 0 {
            log::debug!("Removed {} temporary font files from {}", removed, self.dir.display());
        }
    }
}
