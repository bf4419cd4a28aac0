use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Failures of the task store. Both kinds are logged and swallowed by the
/// store itself and only surface through `read_tasks` and `write_tasks`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load tasks: {0}")]
    Load(#[source] LoadCause),
    #[error("failed to save tasks: {0}")]
    Save(#[source] SaveCause),
}

#[derive(Debug, Error)]
pub enum LoadCause {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("malformed task list: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SaveCause {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("could not encode task list: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields.")]
    MissingRequiredField,
}
