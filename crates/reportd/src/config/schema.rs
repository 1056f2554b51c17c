use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level settings for the report service.
///
/// Every path may be relative; relative paths resolve against `project_root`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
    /// Interpreter override (bare command name or path).
    #[serde(default)]
    pub python_path: Option<String>,
    /// Working directory for the external scripts. Defaults to `<root>/backend`.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub scripts: ScriptSettings,
    #[serde(default)]
    pub data_folder: Option<PathBuf>,
    #[serde(default)]
    pub downloads_folder: Option<PathBuf>,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default = "default_job_timeout_minutes")]
    pub job_timeout_minutes: u64,
    #[serde(default)]
    pub history: HistorySettings,
    #[serde(default)]
    pub jobs: JobSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_job_timeout_minutes() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            python_path: None,
            working_directory: None,
            scripts: ScriptSettings::default(),
            data_folder: None,
            downloads_folder: None,
            ingest: IngestSettings::default(),
            job_timeout_minutes: default_job_timeout_minutes(),
            history: HistorySettings::default(),
            jobs: JobSettings::default(),
            remote: RemoteSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Settings {
    /// Resolves a possibly-relative path against the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// Resolves a required path, failing with the setting's name when absent.
    pub fn require_path(
        &self,
        value: Option<&PathBuf>,
        name: &'static str,
    ) -> Result<PathBuf, ConfigError> {
        match value {
            Some(path) if !path.as_os_str().is_empty() => Ok(self.resolve_path(path)),
            _ => Err(ConfigError::Missing { name }),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        self.require_path(self.data_folder.as_ref(), "DATA_FOLDER")
    }

    pub fn downloads_dir(&self) -> Result<PathBuf, ConfigError> {
        self.require_path(self.downloads_folder.as_ref(), "DOWNLOADS_FOLDER")
    }

    pub fn working_dir(&self) -> PathBuf {
        match &self.working_directory {
            Some(dir) => self.resolve_path(dir),
            None => self.project_root.join("backend"),
        }
    }

    /// Directory the remote sync writes into.
    pub fn sync_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.remote.data_dir {
            return self.resolve_path(dir);
        }
        match &self.data_folder {
            Some(dir) => self.resolve_path(dir),
            None => self.project_root.join("backend").join("data"),
        }
    }

    pub fn history_file(&self) -> PathBuf {
        self.resolve_path(&self.history.file)
    }

    /// Wall-clock limit for a single external process invocation.
    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_minutes.max(1).saturating_mul(60))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSettings {
    #[serde(default)]
    pub ingest: Option<PathBuf>,
    #[serde(default)]
    pub query: Option<PathBuf>,
    #[serde(default)]
    pub generate: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSettings {
    #[serde(default = "default_ingest_pattern")]
    pub pattern: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
}

fn default_ingest_pattern() -> String {
    "SI_*.json".to_string()
}

fn default_chunk_size() -> u32 {
    15_000
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            pattern: default_ingest_pattern(),
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySettings {
    #[serde(default = "default_history_file")]
    pub file: PathBuf,
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_history_file() -> PathBuf {
    PathBuf::from("data").join("history.json")
}

fn default_max_records() -> usize {
    10
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            file: default_history_file(),
            max_records: default_max_records(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSettings {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,
    /// Display-only estimate shown while a job is running.
    #[serde(default = "default_estimated_total_records")]
    pub estimated_total_records: u64,
}

fn default_ttl_minutes() -> u64 {
    60
}

fn default_sweep_interval_minutes() -> u64 {
    10
}

fn default_estimated_total_records() -> u64 {
    19_000
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
            estimated_total_records: default_estimated_total_records(),
        }
    }
}

/// Where a credential comes from: direct value, file, or environment variable.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSource {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
}

impl SecretSource {
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// True when any of the three sources is set to a non-empty string.
    pub fn is_configured(&self) -> bool {
        [&self.value, &self.file, &self.env_var]
            .into_iter()
            .any(|v| v.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSource")
            .field("value", &self.value.as_ref().map(|_| "[REDACTED]"))
            .field("file", &self.file)
            .field("env_var", &self.env_var)
            .finish()
    }
}

/// Remote ERP bulk-data API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    /// Full base URL override; takes precedence over domain + subdomain.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub basic_user: Option<String>,
    #[serde(default)]
    pub basic_password: SecretSource,
    #[serde(default)]
    pub token: SecretSource,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_start_date")]
    pub start_date: String,
    #[serde(default = "default_end_date")]
    pub end_date: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_base_domain() -> String {
    "api.sienge.com.br".to_string()
}

fn default_page_size() -> usize {
    500
}

fn default_max_pages() -> u32 {
    1000
}

fn default_start_date() -> String {
    "2000-01-01".to_string()
}

fn default_end_date() -> String {
    "2100-12-31".to_string()
}

fn default_timeout_ms() -> u64 {
    120_000
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            subdomain: None,
            base_domain: default_base_domain(),
            base_url: None,
            basic_user: None,
            basic_password: SecretSource::default(),
            token: SecretSource::default(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            timeout_ms: default_timeout_ms(),
            data_dir: None,
        }
    }
}

impl RemoteSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether Basic or Bearer credentials are configured. The sources are
    /// not resolved here.
    pub fn has_credentials(&self) -> bool {
        let basic = self.basic_user.as_deref().is_some_and(|u| !u.is_empty())
            && self.basic_password.is_configured();
        basic || self.token.is_configured()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub log_json: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_json: false,
        }
    }
}
