//! Typed failures the shell reports to the user.
//!
//! Everything else travels as `anyhow::Error`; these are the cases callers
//! match on.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("application data directory is not set ({0} is missing)")]
    MissingAppData(&'static str),

    #[error("world save directory not found: {}", .0.display())]
    SaveDirectoryNotFound(PathBuf),

    #[error("backup archive not found: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("no valid backup found in Drive folder {0}")]
    NoValidBackup(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("{0} was cancelled")]
    Cancelled(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("client secret file not found: {}", .0.display())]
    MissingClientSecret(PathBuf),

    #[error("client secret file {} is invalid: {reason}", .path.display())]
    InvalidClientSecret { path: PathBuf, reason: String },

    #[error("authorization flow failed: {0}")]
    Consent(String),

    #[error("failed to build Drive client: {0}")]
    Client(String),
}
