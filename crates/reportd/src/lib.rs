//! Financial report jobs: drive the external report scripts in the
//! background, optionally pulling fresh data from the ERP API first, and
//! keep a bounded history of finished runs.

pub mod config;
pub mod downloads;
pub mod error;
pub mod history;
pub mod jobs;
pub mod runner;
pub mod secrets;
pub mod sync;

pub use config::{load_settings, load_settings_with_env, Settings};
pub use downloads::{resolve_download, DownloadError};
pub use error::{ConfigError, ReportdError, Result};
pub use history::{HistoryEntry, HistoryError, HistoryStore};
pub use jobs::{
    CreateJobOptions, ExpirySweeper, Job, JobError, JobManager, JobManagerOptions,
    JobProgressBroadcaster, JobProgressEvent, JobStatus, ReportFormat, RequestError,
};
pub use runner::{GenerationResult, ProcessError, ProcessExecutor, TokioProcessExecutor};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use sync::{SyncError, SyncManifest, SyncService};
