use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportdError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Process error: {0}")]
    Process(#[from] crate::runner::ProcessError),

    #[error("Sync error: {0}")]
    Sync(#[from] crate::sync::SyncError),

    #[error("History error: {0}")]
    History(#[from] crate::history::HistoryError),

    #[error("Request error: {0}")]
    Request(#[from] crate::jobs::RequestError),

    #[error("Download error: {0}")]
    Download(#[from] crate::downloads::DownloadError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Missing required setting: {name}")]
    Missing { name: &'static str },

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ReportdError>;
