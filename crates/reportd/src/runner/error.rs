//! External process errors.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start {step}: {source}")]
    Spawn {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} timed out after {}s", timeout.as_secs())]
    Timeout { step: String, timeout: Duration },

    #[error("{step} failed with exit code {code}: {stderr}")]
    Exit {
        step: String,
        code: i32,
        stderr: String,
    },

    #[error("Invalid output from {step}: {reason}")]
    InvalidOutput { step: String, reason: String },

    #[error("I/O error while running {step}: {source}")]
    Io {
        step: String,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn step(&self) -> &str {
        match self {
            Self::Spawn { step, .. }
            | Self::Timeout { step, .. }
            | Self::Exit { step, .. }
            | Self::InvalidOutput { step, .. }
            | Self::Io { step, .. } => step,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;
