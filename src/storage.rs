//! On-disk storage for generated QR images.
//!
//! File names are produced by [`unique_filename`] and every name coming back
//! from a client is checked before it touches the filesystem, so callers cannot
//! reach outside the storage directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::qr::OutputFormat;
use crate::utils::url_to_snake_case;

// Longest host slug embedded in generated names.
const MAX_HINT_LENGTH: usize = 32;
// Hex characters of the random suffix.
const UNIQUE_SUFFIX_LENGTH: usize = 12;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid file name '{0}'")]
    InvalidFilename(String),

    #[error("file '{0}' not found")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Builds a collision-resistant file name of the form
/// `qr_code_YYYYMMDD_HHMMSS[_hint]_<12 hex chars>.<ext>`.
///
/// `hint` is typically the target host and is slugged and shortened.
pub fn unique_filename(format: OutputFormat, hint: Option<&str>) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let unique = Uuid::new_v4().simple().to_string();
    let unique = &unique[..UNIQUE_SUFFIX_LENGTH];
    let hint = hint
        .map(|h| url_to_snake_case(h, MAX_HINT_LENGTH))
        .filter(|h| !h.is_empty());
    match hint {
        Some(hint) => format!("qr_code_{}_{}_{}.{}", timestamp, hint, unique, format.extension()),
        None => format!("qr_code_{}_{}.{}", timestamp, unique, format.extension()),
    }
}

/// Directory holding saved QR images.
#[derive(Debug, Clone)]
pub struct QrStorage {
    root: PathBuf,
}

impl QrStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// Resolves `filename` inside the storage directory, creating the directory.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, StorageError> {
        check_filename(filename)?;
        self.ensure_root()?;
        Ok(self.root.join(filename))
    }

    pub fn read(&self, filename: &str) -> Result<Vec<u8>, StorageError> {
        check_filename(filename)?;
        let path = self.root.join(filename);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a stored file. Returns `Ok(false)` if it was already absent,
    /// so repeated deletes succeed.
    pub fn delete(&self, filename: &str) -> Result<bool, StorageError> {
        check_filename(filename)?;
        let path = self.root.join(filename);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted stored QR code {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Delete of missing file {} treated as success", path.display());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Accepts only plain names that survive sanitizing unchanged and are not
/// hidden files.
fn check_filename(filename: &str) -> Result<(), StorageError> {
    let sanitized = sanitize_filename::sanitize(filename);
    if filename.is_empty() || sanitized != filename || filename.starts_with('.') {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}
