use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::jobs::{Job, JobStatus, ReportFormat};
use crate::runner::FileSize;

/// Durable projection of a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub job_id: String,
    #[serde(rename = "formato")]
    pub format: ReportFormat,
    #[serde(default)]
    pub sync_before_run: bool,
    pub status: JobStatus,
    pub file_name: Option<String>,
    pub file_size: Option<FileSize>,
    pub record_count: Option<u64>,
    pub processing_time: String,
    pub created_at: DateTime<Utc>,
    pub download_url: Option<String>,
    pub error: Option<String>,
}

impl HistoryEntry {
    pub fn from_job(id: u64, job: &Job) -> Self {
        Self {
            id,
            job_id: job.job_id.clone(),
            format: job.format,
            sync_before_run: job.sync_before_run,
            status: job.status,
            file_name: job.result.file_name.clone(),
            file_size: job.result.file_size.clone(),
            record_count: job.result.record_count,
            processing_time: format_duration(job.timing.elapsed_seconds),
            created_at: job.timing.start_time,
            download_url: job.result.download_url.clone(),
            error: job.error.clone(),
        }
    }
}

/// `45s`, `2m 5s`, `1h 3m`.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
