//! The work behind each job step.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::Result;
use super::model::ReportFormat;
use crate::config::Settings;
use crate::runner::{GenerationResult, ProcessExecutor, ScriptRunner, TokioProcessExecutor};
use crate::sync::{SyncManifest, SyncService};

/// Collaborators the step driver calls, in order.
#[async_trait]
pub trait ReportSteps: Send + Sync {
    async fn sync_remote(&self) -> Result<SyncManifest>;
    async fn ingest(&self) -> Result<()>;
    async fn consolidate(&self) -> Result<()>;
    async fn generate(&self, format: ReportFormat) -> Result<GenerationResult>;
}

/// Steps backed by the remote sync service and the external scripts.
///
/// Script and directory settings are resolved per call, so a missing one
/// fails only the step that needs it.
pub struct ExternalSteps {
    settings: Arc<Settings>,
    scripts: ScriptRunner,
    sync: SyncService,
}

impl ExternalSteps {
    pub fn new(settings: Arc<Settings>, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            scripts: ScriptRunner::from_settings(&settings, executor),
            sync: SyncService::new(Arc::clone(&settings)),
            settings,
        }
    }

    pub fn from_settings(settings: Arc<Settings>) -> Self {
        Self::new(settings, Arc::new(TokioProcessExecutor::new()))
    }
}

#[async_trait]
impl ReportSteps for ExternalSteps {
    async fn sync_remote(&self) -> Result<SyncManifest> {
        Ok(self.sync.sync_all().await?)
    }

    async fn ingest(&self) -> Result<()> {
        let settings = &self.settings;
        let script =
            settings.require_path(settings.scripts.ingest.as_ref(), "BACKEND_INSERT_SCRIPT")?;
        let data_dir = settings.data_dir()?;
        self.scripts.run_ingest(&script, &data_dir).await?;
        Ok(())
    }

    async fn consolidate(&self) -> Result<()> {
        let settings = &self.settings;
        let script = settings.require_path(settings.scripts.query.as_ref(), "QUERY_SCRIPT")?;
        self.scripts.run_query(&script).await?;
        Ok(())
    }

    async fn generate(&self, format: ReportFormat) -> Result<GenerationResult> {
        let settings = &self.settings;
        let script = settings.require_path(settings.scripts.generate.as_ref(), "REPORT_SCRIPT")?;
        let output_dir = settings.downloads_dir()?;
        Ok(self
            .scripts
            .run_generation(&script, format.as_str(), &output_dir)
            .await?)
    }
}
