//! The three report scripts and their argument contracts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ProcessError, Result};
use super::interpreter::resolve_interpreter;
use super::process::{Invocation, ProcessExecutor};
use crate::config::Settings;

pub const INGEST_STEP: &str = "Backend Insert";
pub const QUERY_STEP: &str = "Query Execution";
pub const GENERATE_STEP: &str = "Report Generation";

/// Size of a generated file as reported by the generator: raw bytes or an
/// already formatted string such as `"12.3 KB"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileSize {
    Bytes(u64),
    Text(String),
}

impl std::fmt::Display for FileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "{} B", bytes),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Structured result printed by the generation script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub file_name: String,
    pub file_size: FileSize,
    pub record_count: u64,
}

/// Extracts the generation result from script stdout.
///
/// The whole output is tried first; otherwise the last line holding a JSON
/// object is used, so diagnostic prints before the result are tolerated.
pub fn parse_generation_output(step: &str, stdout: &str) -> Result<GenerationResult> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ProcessError::InvalidOutput {
            step: step.to_string(),
            reason: "no output".to_string(),
        });
    }

    let parsed = serde_json::from_str::<GenerationResult>(trimmed).or_else(|first_err| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .filter(|line| line.starts_with('{'))
            .find_map(|line| serde_json::from_str::<GenerationResult>(line).ok())
            .ok_or(first_err)
    });

    match parsed {
        Ok(result) if result.file_name.trim().is_empty() => Err(ProcessError::InvalidOutput {
            step: step.to_string(),
            reason: "empty fileName".to_string(),
        }),
        Ok(result) => Ok(result),
        Err(e) => Err(ProcessError::InvalidOutput {
            step: step.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Builds and runs the report script invocations with a shared interpreter,
/// working directory, environment and timeout.
#[derive(Clone)]
pub struct ScriptRunner {
    executor: Arc<dyn ProcessExecutor>,
    interpreter: String,
    working_dir: PathBuf,
    timeout: Duration,
    pattern: String,
    chunk_size: u32,
}

impl ScriptRunner {
    pub fn from_settings(settings: &Settings, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            executor,
            interpreter: resolve_interpreter(
                settings.python_path.as_deref(),
                &settings.project_root,
            ),
            working_dir: settings.working_dir(),
            timeout: settings.process_timeout(),
            pattern: settings.ingest.pattern.clone(),
            chunk_size: settings.ingest.chunk_size,
        }
    }

    fn invocation(&self, step: &str, script: &Path) -> Invocation {
        Invocation::new(step, self.interpreter.clone())
            .arg(script.to_string_lossy())
            .current_dir(&self.working_dir)
            .env("PYTHONUTF8", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .timeout(self.timeout)
    }

    pub fn ingest_invocation(&self, script: &Path, data_dir: &Path) -> Invocation {
        self.invocation(INGEST_STEP, script).args([
            "--dir".to_string(),
            data_dir.to_string_lossy().into_owned(),
            "--pattern".to_string(),
            self.pattern.clone(),
            "--mode".to_string(),
            "quick".to_string(),
            "--chunk-size".to_string(),
            self.chunk_size.to_string(),
            "--if-exists".to_string(),
            "replace".to_string(),
        ])
    }

    pub fn generation_invocation(
        &self,
        script: &Path,
        format: &str,
        output_dir: &Path,
    ) -> Invocation {
        self.invocation(GENERATE_STEP, script).args([
            "--formato".to_string(),
            format.to_string(),
            "--output-dir".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ])
    }

    /// Loads raw JSON files from `data_dir` into local storage.
    pub async fn run_ingest(&self, script: &Path, data_dir: &Path) -> Result<String> {
        self.executor
            .run(&self.ingest_invocation(script, data_dir))
            .await
    }

    /// Runs the consolidation query. The script takes no arguments.
    pub async fn run_query(&self, script: &Path) -> Result<String> {
        self.executor.run(&self.invocation(QUERY_STEP, script)).await
    }

    pub async fn run_generation(
        &self,
        script: &Path,
        format: &str,
        output_dir: &Path,
    ) -> Result<GenerationResult> {
        let stdout = self
            .executor
            .run(&self.generation_invocation(script, format, output_dir))
            .await?;
        parse_generation_output(GENERATE_STEP, &stdout)
    }
}
