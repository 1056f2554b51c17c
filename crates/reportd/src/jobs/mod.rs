//! Report jobs: model, step driver, expiry and progress notifications.

pub mod error;
pub mod manager;
pub mod model;
pub mod progress;
pub mod steps;
pub mod sweeper;

pub use error::{JobError, RequestError};
pub use manager::{CreateJobOptions, JobManager, JobManagerOptions};
pub use model::{CurrentStep, Job, JobResultInfo, JobStatus, Progress, ReportFormat, Timing};
pub use progress::{JobProgressBroadcaster, JobProgressEvent};
pub use steps::{ExternalSteps, ReportSteps};
pub use sweeper::ExpirySweeper;
