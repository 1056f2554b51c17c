//! Test harness for running report jobs against real child processes.
//!
//! The external scripts are replaced by small `sh` scripts, and the
//! interpreter is set to `sh`, so the full executor path (spawn, streamed
//! capture, exit codes, trailing JSON result) runs without Python.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use reportd::{Job, JobManager, Settings};

pub const INGEST_OK: &str = "echo \"ingest $*\"\n";

pub const QUERY_OK: &str = "echo \"query done\"\n";

/// Writes `relatorio.<fmt>` into the output dir and prints the result
/// object after a diagnostic line.
pub const GENERATE_OK: &str = r#"fmt="$2"
out="$4"
echo "writing report to $out"
printf 'a;b\n1;2\n' > "$out/relatorio.$fmt"
echo "{\"fileName\": \"relatorio.$fmt\", \"fileSize\": 8, \"recordCount\": 1, \"formato\": \"$fmt\"}"
"#;

pub struct TestHarness {
    temp_dir: TempDir,
    pub settings: Settings,
}

impl TestHarness {
    /// A project root with working scripts for every step.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();

        for dir in ["backend", "data", "downloads", "scripts"] {
            std::fs::create_dir_all(root.join(dir)).expect("Failed to create project dir");
        }

        let mut settings = Settings::default();
        settings.project_root = root.to_path_buf();
        settings.python_path = Some("sh".to_string());
        settings.data_folder = Some(PathBuf::from("data"));
        settings.downloads_folder = Some(PathBuf::from("downloads"));
        settings.scripts.ingest = Some(PathBuf::from("scripts/ingest.sh"));
        settings.scripts.query = Some(PathBuf::from("scripts/query.sh"));
        settings.scripts.generate = Some(PathBuf::from("scripts/generate.sh"));
        settings.history.file = PathBuf::from("data/history.json");
        settings.job_timeout_minutes = 1;

        let harness = Self { temp_dir, settings };
        harness.write_script("ingest.sh", INGEST_OK);
        harness.write_script("query.sh", QUERY_OK);
        harness.write_script("generate.sh", GENERATE_OK);
        harness
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root().join("downloads")
    }

    /// Replaces one of the fake scripts.
    pub fn write_script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.root().join("scripts").join(name);
        std::fs::write(&path, body).expect("Failed to write script");
        path
    }

    pub fn manager(&self) -> JobManager {
        JobManager::from_settings(Arc::new(self.settings.clone()))
    }
}

/// Polls until the job leaves `processing`.
pub async fn wait_for_terminal(manager: &JobManager, job_id: &str) -> Job {
    for _ in 0..500 {
        let job = manager.get_job(job_id).expect("job should still be live");
        if job.is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} did not finish in time");
}

/// Polls until the history file holds an entry for `job_id`.
pub async fn wait_for_history(manager: &JobManager, job_id: &str) -> reportd::HistoryEntry {
    for _ in 0..500 {
        let history = manager.history().get_history().await;
        if let Some(entry) = history.into_iter().find(|e| e.job_id == job_id) {
            return entry;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never reached history");
}
