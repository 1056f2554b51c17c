//! In-memory job table and the step driver.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::Instrument;

use super::error::{JobError, RequestError, Result};
use super::model::{Job, ReportFormat};
use super::progress::JobProgressBroadcaster;
use super::steps::{ExternalSteps, ReportSteps};
use crate::config::Settings;
use crate::history::HistoryStore;

const STEP_SYNC: &str = "Syncing remote ERP data...";
const STEP_INGEST: &str = "Loading JSON into the database...";
const STEP_QUERY: &str = "Running consolidated query...";
const STEP_GENERATE: &str = "Generating report file...";
const STEP_FINALIZE: &str = "Finalizing...";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateJobOptions {
    pub sync_before_run: bool,
}

#[derive(Debug, Clone)]
pub struct JobManagerOptions {
    /// Age after which a job is dropped from the table.
    pub ttl: Duration,
    pub sweep_interval: Duration,
    pub estimated_total_records: u64,
}

impl JobManagerOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            ttl: minutes(settings.jobs.ttl_minutes),
            sweep_interval: minutes(settings.jobs.sweep_interval_minutes.max(1)),
            estimated_total_records: settings.jobs.estimated_total_records,
        }
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

impl Default for JobManagerOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Live jobs keyed by id. Every mutation happens under one write lock, so
/// readers see either the previous or the next snapshot.
#[derive(Default)]
struct JobTable {
    jobs: RwLock<HashMap<String, Job>>,
}

impl JobTable {
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job table lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job table lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn insert(&self, job: Job) {
        self.write().insert(job.job_id.clone(), job);
    }

    fn get(&self, job_id: &str) -> Option<Job> {
        self.read().get(job_id).cloned()
    }

    /// Applies `f` to the live job and returns the updated snapshot.
    fn update<F>(&self, job_id: &str, f: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut jobs = self.write();
        let job = jobs.get_mut(job_id)?;
        f(job);
        Some(job.clone())
    }

    fn remove_expired(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> Vec<String> {
        let mut jobs = self.write();
        let expired: Vec<String> = jobs
            .values()
            .filter(|job| job.is_expired(now, ttl))
            .map(|job| job.job_id.clone())
            .collect();
        for job_id in &expired {
            jobs.remove(job_id);
        }
        expired
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

struct Inner {
    table: JobTable,
    steps: Arc<dyn ReportSteps>,
    history: Arc<HistoryStore>,
    broadcaster: JobProgressBroadcaster,
    options: JobManagerOptions,
}

/// Creates report jobs and drives them through their steps in the
/// background.
///
/// Jobs live in memory only and are lost when the process exits. Cloning
/// the manager shares the same table.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

impl JobManager {
    pub fn new(
        steps: Arc<dyn ReportSteps>,
        history: Arc<HistoryStore>,
        options: JobManagerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: JobTable::default(),
                steps,
                history,
                broadcaster: JobProgressBroadcaster::default(),
                options,
            }),
        }
    }

    /// Wires the external scripts, remote sync and history file from
    /// settings.
    pub fn from_settings(settings: Arc<Settings>) -> Self {
        let history = Arc::new(HistoryStore::from_settings(&settings));
        let options = JobManagerOptions::from_settings(&settings);
        let steps = Arc::new(ExternalSteps::from_settings(settings));
        Self::new(steps, history, options)
    }

    pub fn options(&self) -> &JobManagerOptions {
        &self.inner.options
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.inner.history
    }

    pub fn broadcaster(&self) -> &JobProgressBroadcaster {
        &self.inner.broadcaster
    }

    pub fn job_count(&self) -> usize {
        self.inner.table.len()
    }

    /// Registers a new job and starts driving it on the tokio runtime.
    /// Returns immediately with the `processing` snapshot.
    pub fn create_job(&self, format: ReportFormat, options: CreateJobOptions) -> Job {
        let job = Job::new(
            uuid::Uuid::new_v4().to_string(),
            format,
            options.sync_before_run,
            self.inner.options.estimated_total_records,
            Utc::now(),
        );
        self.inner.table.insert(job.clone());
        self.inner.broadcaster.publish(&job);

        log::info!(
            "Job created: {} (format: {}, sync: {})",
            job.job_id,
            job.format,
            job.sync_before_run
        );

        let manager = self.clone();
        let job_id = job.job_id.clone();
        let span = tracing::info_span!("report_job", job_id = %job_id, format = %format);
        tokio::spawn(async move { manager.drive(job_id).await }.instrument(span));

        job
    }

    pub fn get_job(&self, job_id: &str) -> std::result::Result<Job, RequestError> {
        self.inner
            .table
            .get(job_id)
            .ok_or_else(|| RequestError::JobNotFound(job_id.to_string()))
    }

    /// Removes every job older than the TTL, whatever its status.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        // A TTL beyond chrono's range never expires anything.
        let ttl = chrono::Duration::from_std(self.inner.options.ttl)
            .unwrap_or(chrono::Duration::MAX);
        let removed = self.inner.table.remove_expired(now, ttl);
        for job_id in &removed {
            log::info!("Job expired: {}", job_id);
        }
        removed.len()
    }

    /// Mutates the live job and publishes the new snapshot.
    fn update<F>(&self, job_id: &str, f: F) -> Result<Job>
    where
        F: FnOnce(&mut Job),
    {
        let job = self
            .inner
            .table
            .update(job_id, f)
            .ok_or_else(|| JobError::Evicted(job_id.to_string()))?;
        self.inner.broadcaster.publish(&job);
        Ok(job)
    }

    fn begin_step(&self, job_id: &str, number: u8, description: &str) -> Result<()> {
        let job = self.update(job_id, |job| job.begin_step(number, description))?;
        log::info!(
            "[{}] Step {}/{}: {}",
            job_id,
            number,
            job.current_step.total,
            description
        );
        Ok(())
    }

    async fn drive(self, job_id: String) {
        let Some(job) = self.inner.table.get(&job_id) else {
            return;
        };

        let outcome = self
            .run_steps(&job_id, job.format, job.sync_before_run)
            .await;
        let now = Utc::now();

        let finished = match outcome {
            Ok(()) => self.update(&job_id, |job| {
                job.complete(now);
            }),
            Err(JobError::Evicted(_)) => {
                log::warn!("Job {} was removed while running", job_id);
                return;
            }
            Err(e) => {
                log::error!("Job failed: {} - {}", job_id, e);
                let message = e.to_string();
                self.update(&job_id, |job| {
                    job.fail(message, now);
                })
            }
        };

        let job = match finished {
            Ok(job) => job,
            Err(_) => {
                log::warn!("Job {} was removed before it could be finalized", job_id);
                return;
            }
        };

        log::info!(
            "Job {}: {} in {}s",
            job_id,
            job.status,
            job.timing.elapsed_seconds
        );

        if let Err(e) = self.inner.history.add_entry(&job).await {
            log::error!("Failed to record job {} in history: {}", job_id, e);
        }
    }

    async fn run_steps(&self, job_id: &str, format: ReportFormat, sync: bool) -> Result<()> {
        let steps = &self.inner.steps;

        if sync {
            self.begin_step(job_id, 0, STEP_SYNC)?;
            let manifest = steps
                .sync_remote()
                .instrument(tracing::info_span!("step", name = "sync"))
                .await?;
            log::info!(
                "[{}] Synced {} files ({} records)",
                job_id,
                manifest.files.len(),
                manifest.total_records()
            );
            self.update(job_id, |job| job.advance_progress(10))?;
        }

        self.begin_step(job_id, 1, STEP_INGEST)?;
        steps
            .ingest()
            .instrument(tracing::info_span!("step", name = "ingest"))
            .await?;
        self.update(job_id, |job| job.advance_progress(25))?;

        self.begin_step(job_id, 2, STEP_QUERY)?;
        steps
            .consolidate()
            .instrument(tracing::info_span!("step", name = "query"))
            .await?;
        self.update(job_id, |job| job.advance_progress(50))?;

        self.begin_step(job_id, 3, STEP_GENERATE)?;
        let result = steps
            .generate(format)
            .instrument(tracing::info_span!("step", name = "generate"))
            .await?;
        self.update(job_id, |job| {
            job.set_result(&result);
            job.advance_progress(75);
        })?;

        self.begin_step(job_id, 4, STEP_FINALIZE)?;
        self.update(job_id, |job| job.advance_progress(100))?;

        Ok(())
    }
}
