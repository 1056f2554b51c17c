//! Job error types.

use thiserror::Error;

use crate::error::ConfigError;
use crate::runner::ProcessError;
use crate::sync::SyncError;

/// A step failure. Its display text is what a failed job records.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Job {0} was removed before it finished")]
    Evicted(String),
}

/// Bad input from a caller. Never a system fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid format '{0}': expected csv, xls or txt")]
    InvalidFormat(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

pub type Result<T> = std::result::Result<T, JobError>;
