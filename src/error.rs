//! Unified error types for the campaign backend.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::RecordKind;

/// Unified error type for the campaign backend.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seed data could not be loaded or is inconsistent.
    #[error("seed data error: {0}")]
    Seed(String),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors raised by a storage backend.
///
/// Absence of a record is never an error; backends report it as `None`.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing a backing file failed.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Persisted content exists but cannot be decoded.
    #[error("malformed {record} data: {reason}")]
    Malformed {
        /// Which record was being read.
        record: RecordKind,
        /// Decoder message.
        reason: String,
    },

    /// Could not encode a record for writing.
    #[error("failed to encode {record}: {source}")]
    Encode {
        /// Which record was being written.
        record: RecordKind,
        /// Encoder error.
        source: serde_json::Error,
    },

    /// Transport failure talking to a remote store.
    #[error("remote store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote store answered with a non-success status.
    #[error("remote store returned HTTP {status} for {record}: {body}")]
    Status {
        /// Which record was being accessed.
        record: RecordKind,
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The backend is missing required settings.
    #[error("backend not configured: {0}")]
    Unconfigured(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
