//! Persisted history of finished report jobs.

pub mod entry;
pub mod store;

use std::path::PathBuf;
use thiserror::Error;

pub use entry::{format_duration, HistoryEntry};
pub use store::HistoryStore;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to read history file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse history file: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to write history file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;
