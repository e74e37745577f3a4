//! Credential Store
//!
//! Holds the opaque API key that authorizes generation calls. The key lives
//! in `credentials.toml` inside the studio config directory and survives
//! process restarts and workflow resets alike.
//!
//! # Lifecycle
//!
//! ```text
//! open(path) ──> get / set / clear ──> close()
//!      │              │                   │
//!   load file    write-through        flush if a
//!   (missing =   (temp + rename)      write failed
//!    empty)
//! ```
//!
//! A failed write keeps the new value in memory and marks the store dirty;
//! [`CredentialStore::flush`] and [`CredentialStore::close`] retry it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name of the credential file inside the config directory
pub const CREDENTIALS_FILE: &str = "credentials.toml";

/// Errors from loading or persisting the credential
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Filesystem failure
    #[error("credential file {path:?}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Existing file is not valid TOML
    #[error("credential file {path:?} is malformed: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// Value could not be encoded
    #[error("failed to encode credential: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// On-disk format
#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    api_key: String,
}

/// Persisted API credential
pub struct CredentialStore {
    path: Option<PathBuf>,
    value: String,
    dirty: bool,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("path", &self.path)
            .field("is_set", &self.is_set())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl CredentialStore {
    /// Open the credential file, starting empty if it does not exist
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let value = match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: CredentialFile =
                    toml::from_str(&raw).map_err(|source| CredentialError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                file.api_key
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "no credential file yet");
                String::new()
            }
            Err(source) => return Err(CredentialError::Io { path, source }),
        };

        tracing::debug!(path = ?path, is_set = !value.is_empty(), "credential store opened");
        Ok(Self {
            path: Some(path),
            value,
            dirty: false,
        })
    }

    /// Store that never touches the filesystem
    #[must_use]
    pub fn in_memory(value: impl Into<String>) -> Self {
        Self {
            path: None,
            value: value.into(),
            dirty: false,
        }
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current credential (empty when unset)
    #[must_use]
    pub fn get(&self) -> &str {
        &self.value
    }

    /// Whether a non-empty credential is stored
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// Whether the last write failed and is pending
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the credential and persist it
    ///
    /// The in-memory value changes even when the write fails.
    ///
    /// # Errors
    ///
    /// Returns the persistence error; the store stays dirty until a later
    /// flush succeeds.
    pub fn set(&mut self, value: impl Into<String>) -> Result<(), CredentialError> {
        self.value = value.into();
        self.dirty = true;
        self.flush()
    }

    /// Forget the credential
    ///
    /// # Errors
    ///
    /// Same as [`CredentialStore::set`].
    pub fn clear(&mut self) -> Result<(), CredentialError> {
        self.set(String::new())
    }

    /// Write pending changes
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&mut self) -> Result<(), CredentialError> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = self.path.clone() else {
            self.dirty = false;
            return Ok(());
        };

        let encoded = toml::to_string(&CredentialFile {
            api_key: self.value.clone(),
        })?;
        write_atomic(&path, &encoded)?;

        self.dirty = false;
        tracing::debug!(path = ?path, "credential persisted");
        Ok(())
    }

    /// Flush and release the store
    ///
    /// # Errors
    ///
    /// Returns an error if a pending write still fails.
    pub fn close(mut self) -> Result<(), CredentialError> {
        self.flush()
    }
}

/// Write via temp file + rename so a crash never leaves a half-written key
fn write_atomic(path: &Path, contents: &str) -> Result<(), CredentialError> {
    let io_err = |source| CredentialError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, contents).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }

    fs::rename(&tmp, path).map_err(io_err)
}
