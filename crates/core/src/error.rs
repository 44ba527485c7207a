//! Failure taxonomy shared by the store, the asset manager and the launcher service.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shortcuts::ShortcutOwner;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A file could not be read, written, copied or removed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A document on disk is not valid JSON.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A known settings key was given a value of another type.
    #[error("setting '{key}' cannot hold that value: {source}")]
    InvalidSetting {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Timeout, connection or TLS failure while talking to a remote service.
    #[error("network request failed: {0}")]
    Network(String),

    /// A request the caller has to decide about (confirm, retry, abort).
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("shortcut '{shortcut}' is already used by {owner}")]
    ShortcutTaken {
        shortcut: String,
        owner: ShortcutOwner,
    },

    #[error("shortcut '{0}' is reserved by the system")]
    ReservedShortcut(String),

    #[error("'{0}' is not a shortcut: expected one key with optional modifiers")]
    InvalidShortcut(String),

    #[error("{} is not a launcher preset: expected an `entries` or `settings` key", path.display())]
    InvalidPreset { path: PathBuf },

    #[error("could not back up the current document to {}: {reason}", path.display())]
    BackupFailed { path: PathBuf, reason: String },

    #[error("entry '{0}' was not found")]
    EntryNotFound(String),

    #[error("group '{0}' was not found")]
    GroupNotFound(String),

    #[error("group '{0}' already exists")]
    GroupExists(String),

    #[error("name cannot be empty")]
    EmptyName,
}
