//! Error types for codebreak-core.
//!
//! Validation failures are always recoverable and surfaced as values at the
//! registry boundary; store failures during scheduled flushes are logged and
//! retried, while an explicit force-save propagates them to the caller.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("import error: {0}")]
    Import(#[from] ImportError),
}

/// Recoverable input validation failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("profile name is blank")]
    BlankName,

    #[error("profile name '{0}' is too long")]
    NameTooLong(String),

    #[error("a profile named '{0}' already exists")]
    DuplicateName(String),

    #[error("no profile named '{0}'")]
    UnknownProfile(String),

    #[error("the last remaining profile cannot be deleted")]
    LastProfile,

    #[error("built-in profile '{0}' cannot be deleted")]
    ProtectedProfile(String),

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Persistence failures from the profile store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode profile data: {0}")]
    Encode(String),

    #[error("data directory unavailable: {0}")]
    DataDir(String),
}

/// Failures while importing profiles from an external file.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("failed to read {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither JSON nor TOML parsing accepted the file.
    #[error("unrecognized profile file format: {0}")]
    UnrecognizedFormat(String),
}

/// Result type alias for CoreError.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
