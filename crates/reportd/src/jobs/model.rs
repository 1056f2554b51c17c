//! Report job state as seen by pollers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RequestError;
use crate::runner::{FileSize, GenerationResult};

/// Output format of a generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Csv,
    #[serde(alias = "xlsx")]
    Xls,
    Txt,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Xls => "xls",
            ReportFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; `xlsx` is accepted as `xls`.
impl FromStr for ReportFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "xls" | "xlsx" => Ok(ReportFormat::Xls),
            "txt" => Ok(ReportFormat::Txt),
            _ => Err(RequestError::InvalidFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStep {
    pub number: u8,
    pub total: u8,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub percentage: u8,
    pub records_processed: u64,
    /// Display-only estimate.
    pub total_records: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
}

/// Generated file metadata; all fields are set together or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResultInfo {
    pub download_url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<FileSize>,
    pub record_count: Option<u64>,
}

impl JobResultInfo {
    pub fn is_empty(&self) -> bool {
        self.file_name.is_none()
    }
}

/// Snapshot of one report job.
///
/// Snapshots handed out by the manager are copies; mutating one has no
/// effect on the live job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    #[serde(rename = "formato")]
    pub format: ReportFormat,
    pub sync_before_run: bool,
    pub status: JobStatus,
    pub current_step: CurrentStep,
    pub progress: Progress,
    pub timing: Timing,
    pub result: JobResultInfo,
    pub error: Option<String>,
    /// Used for expiry only.
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(
        job_id: String,
        format: ReportFormat,
        sync_before_run: bool,
        estimated_total_records: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            format,
            sync_before_run,
            status: JobStatus::Processing,
            current_step: CurrentStep {
                number: 1,
                total: Self::total_steps_for(sync_before_run),
                description: "Initializing...".to_string(),
            },
            progress: Progress {
                percentage: 0,
                records_processed: 0,
                total_records: estimated_total_records,
            },
            timing: Timing {
                start_time: now,
                end_time: None,
                elapsed_seconds: 0,
            },
            result: JobResultInfo::default(),
            error: None,
            created_at: now,
        }
    }

    pub fn total_steps_for(sync_before_run: bool) -> u8 {
        if sync_before_run {
            5
        } else {
            4
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True once `now - created_at` exceeds `ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }

    pub fn begin_step(&mut self, number: u8, description: &str) {
        if self.is_terminal() {
            return;
        }
        self.current_step = CurrentStep {
            number,
            total: Self::total_steps_for(self.sync_before_run),
            description: description.to_string(),
        };
    }

    /// Raises the percentage; never lowers it.
    pub fn advance_progress(&mut self, percentage: u8) {
        if self.is_terminal() {
            return;
        }
        self.progress.percentage = self.progress.percentage.max(percentage.min(100));
    }

    pub fn set_result(&mut self, result: &GenerationResult) {
        if self.is_terminal() {
            return;
        }
        self.result = JobResultInfo {
            download_url: Some(format!("/downloads/{}", result.file_name)),
            file_name: Some(result.file_name.clone()),
            file_size: Some(result.file_size.clone()),
            record_count: Some(result.record_count),
        };
        self.progress.records_processed = result.record_count;
    }

    fn finish(&mut self, status: JobStatus, now: DateTime<Utc>) {
        self.status = status;
        self.timing.end_time = Some(now);
        self.timing.elapsed_seconds = (now - self.timing.start_time).num_seconds().max(0) as u64;
    }

    /// Moves a processing job to `completed`. Returns false if it was
    /// already terminal.
    pub fn complete(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.progress.percentage = 100;
        self.finish(JobStatus::Completed, now);
        true
    }

    /// Moves a processing job to `failed`, discarding any partial result.
    /// Returns false if it was already terminal.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.result = JobResultInfo::default();
        self.error = Some(message.into());
        self.finish(JobStatus::Failed, now);
        true
    }
}
