//! Remote sync error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(
        "Remote API authentication not configured: set SIENGE_BASIC_USER/SIENGE_BASIC_PASS or SIENGE_TOKEN"
    )]
    AuthConfig,

    #[error("Failed to resolve remote API credential: {0}")]
    Credential(#[from] crate::secrets::SecretError),

    #[error("Remote API returned {status} for {path}: {body}")]
    Http {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Invalid JSON response from {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Request to {path} timed out after {timeout_ms}ms")]
    Timeout { path: String, timeout_ms: u64 },

    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid remote API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Failed to write '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SyncError>;
