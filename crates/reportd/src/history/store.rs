//! Bounded newest-first history kept in a single JSON file.

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use super::entry::HistoryEntry;
use super::{HistoryError, Result};
use crate::config::Settings;
use crate::jobs::Job;

pub struct HistoryStore {
    path: PathBuf,
    max_records: usize,
    /// Serializes read-modify-write cycles of the file.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records: max_records.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.history_file(), settings.history.max_records)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Entries newest first. A missing or unreadable file is empty history.
    pub async fn get_history(&self) -> Vec<HistoryEntry> {
        match self.load().await {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Treating history as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Records a finished job as the newest entry and trims the oldest
    /// beyond the retention bound.
    pub async fn add_entry(&self, job: &Job) -> Result<HistoryEntry> {
        let _guard = self.write_lock.lock().await;

        let mut entries = self.get_history().await;
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let entry = HistoryEntry::from_job(next_id, job);

        entries.insert(0, entry.clone());
        entries.truncate(self.max_records);
        self.save(&entries).await?;

        log::info!("History updated with job {}", job.job_id);
        Ok(entry)
    }

    async fn load(&self) -> Result<Vec<HistoryEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(HistoryError::Parse)
    }

    /// Writes to a sibling temp file, then renames over the real one.
    async fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HistoryError::Write {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = serde_json::to_string_pretty(entries).map_err(HistoryError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| HistoryError::Write {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HistoryError::Write {
                path: self.path.clone(),
                source: e,
            })
    }
}
