use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::client::RemoteClient;
use super::error::{Result, SyncError};
use super::pagination::{fetch_all_pages, PageLimits, PageSource};
use super::task::{default_tasks, SyncTask};
use crate::config::Settings;

/// One dataset written by a sync run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedFile {
    pub id: String,
    pub file_name: String,
    pub saved_path: PathBuf,
    pub endpoint: String,
    pub pages_fetched: u32,
    pub records: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncManifest {
    pub started_at: DateTime<Utc>,
    pub data_dir: PathBuf,
    pub files: Vec<SyncedFile>,
    pub finished_at: DateTime<Utc>,
}

impl SyncManifest {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records).sum()
    }
}

/// Pulls every remote dataset into the local data directory.
#[derive(Clone)]
pub struct SyncService {
    settings: Arc<Settings>,
}

impl SyncService {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn tasks(&self) -> Vec<SyncTask> {
        let remote = &self.settings.remote;
        default_tasks(&remote.start_date, &remote.end_date)
    }

    /// Runs a full sync against the configured remote API.
    pub async fn sync_all(&self) -> Result<SyncManifest> {
        let client = RemoteClient::from_settings(&self.settings.remote)?;
        log::info!("[sync] starting full sync from {}", client.base_url());
        self.sync_with(&client).await
    }

    /// Runs the tasks in order against `source`; the first failure aborts
    /// the rest.
    pub async fn sync_with<S>(&self, source: &S) -> Result<SyncManifest>
    where
        S: PageSource + ?Sized,
    {
        let started_at = Utc::now();
        let data_dir = self.settings.sync_data_dir();
        let limits = PageLimits {
            page_size: self.settings.remote.page_size.max(1),
            max_pages: self.settings.remote.max_pages,
        };

        let mut files = Vec::new();
        for task in self.tasks() {
            let dataset = fetch_all_pages(source, &task, limits).await?;
            let saved_path = write_json(&data_dir, task.file_name, &dataset.payload).await?;

            log::info!(
                "[sync] wrote {} ({} records in {} page(s))",
                task.file_name,
                dataset.records,
                dataset.pages_fetched
            );

            files.push(SyncedFile {
                id: task.id.to_string(),
                file_name: task.file_name.to_string(),
                saved_path,
                endpoint: task.endpoint.to_string(),
                pages_fetched: dataset.pages_fetched,
                records: dataset.records,
            });
        }

        Ok(SyncManifest {
            started_at,
            data_dir,
            files,
            finished_at: Utc::now(),
        })
    }
}

async fn write_json(dir: &Path, file_name: &str, payload: &Value) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SyncError::WriteFile {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let path = dir.join(file_name);
    let content = serde_json::to_vec_pretty(payload).map_err(|e| SyncError::WriteFile {
        path: path.clone(),
        source: e.into(),
    })?;
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| SyncError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticSource {
        endpoints: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl PageSource for StaticSource {
        async fn fetch_page(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
            let selection = query
                .iter()
                .find(|(k, _)| *k == "selectionType")
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            self.endpoints
                .lock()
                .unwrap()
                .push(format!("{}{}", endpoint, selection));

            if Some(selection.as_str()) == self.fail_on {
                return Err(SyncError::Http {
                    status: 500,
                    path: endpoint.to_string(),
                    body: "boom".to_string(),
                });
            }
            Ok(json!({ "data": [{ "endpoint": endpoint, "selection": selection }] }))
        }
    }

    fn service(dir: &Path) -> SyncService {
        let mut settings = Settings::default();
        settings.remote.data_dir = Some(dir.to_path_buf());
        SyncService::new(Arc::new(settings))
    }

    #[tokio::test]
    async fn test_sync_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource {
            endpoints: Mutex::new(Vec::new()),
            fail_on: None,
        };

        let manifest = service(dir.path()).sync_with(&source).await.unwrap();

        assert_eq!(manifest.files.len(), 4);
        assert_eq!(manifest.total_records(), 4);
        assert!(manifest.finished_at >= manifest.started_at);
        for file in &manifest.files {
            assert!(file.saved_path.exists(), "{}", file.file_name);
        }

        let saved: Value = serde_json::from_slice(
            &std::fs::read(dir.path().join("SI_DATAPAGTO.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["data"][0]["selection"], "P");
    }

    #[tokio::test]
    async fn test_first_failure_aborts_remaining_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let source = StaticSource {
            endpoints: Mutex::new(Vec::new()),
            fail_on: Some("P"),
        };

        let err = service(dir.path()).sync_with(&source).await.unwrap_err();
        assert!(matches!(err, SyncError::Http { status: 500, .. }));

        let endpoints = source.endpoints.lock().unwrap().clone();
        assert_eq!(
            endpoints,
            vec!["/customer-extract-history", "/incomeB", "/incomeP"]
        );
        assert!(!dir.path().join("SI_DATAEMISSAO.json").exists());
    }

    #[tokio::test]
    async fn test_sync_all_requires_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let err = service(dir.path()).sync_all().await.unwrap_err();
        assert!(matches!(err, SyncError::AuthConfig));
    }
}
