use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::schema::{SecretSource, Settings};
use crate::error::ConfigError;

/// Upper bound for every minutes setting: one year.
pub const MAX_MINUTES: u64 = 365 * 24 * 60;

/// Loads settings from a JSON file. Environment overrides are not applied.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let settings = read_settings(path.as_ref())?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}

/// Reads the optional JSON file, overlays the process environment and
/// validates the merged result.
pub fn load_settings_with_env(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_layered(path, |key| std::env::var(key).ok())
}

fn load_layered<F>(path: Option<&Path>, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = match path {
        Some(path) => read_settings(path)?,
        None => Settings::default(),
    };
    settings.apply_env_from(lookup);
    settings.validate()?;
    Ok(settings)
}

fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn at_least_one(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn within_max_minutes(name: &'static str, value: u64) -> Result<(), ConfigError> {
    if value > MAX_MINUTES {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at most {} minutes", MAX_MINUTES),
        });
    }
    Ok(())
}

impl Settings {
    /// Rejects values the job manager and sync client cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        at_least_one("HISTORY_MAX_RECORDS", self.history.max_records as u64)?;
        at_least_one("SIENGE_PAGE_SIZE", self.remote.page_size as u64)?;
        at_least_one(
            "JOB_SWEEP_INTERVAL_MINUTES",
            self.jobs.sweep_interval_minutes,
        )?;
        within_max_minutes("JOB_TIMEOUT_MINUTES", self.job_timeout_minutes)?;
        within_max_minutes("JOB_TTL_MINUTES", self.jobs.ttl_minutes)?;
        within_max_minutes(
            "JOB_SWEEP_INTERVAL_MINUTES",
            self.jobs.sweep_interval_minutes,
        )?;
        Ok(())
    }

    /// Overlays values from an arbitrary lookup (environment-shaped keys).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get("PROJECT_ROOT") {
            self.project_root = PathBuf::from(root);
        }
        if let Some(python) = get("PYTHON_PATH") {
            self.python_path = Some(python);
        }
        if let Some(dir) = get("SCRIPTS_WORKING_DIR") {
            self.working_directory = Some(PathBuf::from(dir));
        }
        if let Some(script) = get("BACKEND_INSERT_SCRIPT") {
            self.scripts.ingest = Some(PathBuf::from(script));
        }
        if let Some(script) = get("QUERY_SCRIPT") {
            self.scripts.query = Some(PathBuf::from(script));
        }
        if let Some(script) = get("REPORT_SCRIPT") {
            self.scripts.generate = Some(PathBuf::from(script));
        }
        if let Some(dir) = get("DATA_FOLDER") {
            self.data_folder = Some(PathBuf::from(dir));
        }
        if let Some(dir) = get("DOWNLOADS_FOLDER") {
            self.downloads_folder = Some(PathBuf::from(dir));
        }
        if let Some(pattern) = get("BACKEND_INSERT_PATTERN") {
            self.ingest.pattern = pattern;
        }
        parse_into(&get, "BACKEND_INSERT_CHUNK_SIZE", &mut self.ingest.chunk_size);
        parse_into(&get, "JOB_TIMEOUT_MINUTES", &mut self.job_timeout_minutes);

        if let Some(file) = get("HISTORY_FILE") {
            self.history.file = PathBuf::from(file);
        }
        parse_into(&get, "HISTORY_MAX_RECORDS", &mut self.history.max_records);

        parse_into(&get, "JOB_TTL_MINUTES", &mut self.jobs.ttl_minutes);
        parse_into(
            &get,
            "JOB_SWEEP_INTERVAL_MINUTES",
            &mut self.jobs.sweep_interval_minutes,
        );

        let remote = &mut self.remote;
        if let Some(subdomain) = get("SIENGE_SUBDOMAIN") {
            remote.subdomain = Some(subdomain);
        }
        if let Some(domain) = get("SIENGE_BASE_DOMAIN") {
            remote.base_domain = domain;
        }
        if let Some(url) = get("SIENGE_BASE_URL") {
            remote.base_url = Some(url);
        }
        if let Some(user) = get("SIENGE_BASIC_USER") {
            remote.basic_user = Some(user);
        }
        if let Some(pass) = get("SIENGE_BASIC_PASS") {
            remote.basic_password = SecretSource::from_value(pass);
        }
        if let Some(token) = get("SIENGE_TOKEN") {
            remote.token = SecretSource::from_value(token);
        }
        if let Some(start) = get("SIENGE_START_DATE") {
            remote.start_date = start;
        }
        if let Some(end) = get("SIENGE_END_DATE") {
            remote.end_date = end;
        }
        parse_into(&get, "SIENGE_PAGE_SIZE", &mut remote.page_size);
        parse_into(&get, "SIENGE_MAX_PAGES", &mut remote.max_pages);
        parse_into(&get, "SIENGE_TIMEOUT_MS", &mut remote.timeout_ms);
        if let Some(dir) = get("SIENGE_DATA_DIR") {
            remote.data_dir = Some(PathBuf::from(dir));
        }

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        parse_into(&get, "PORT", &mut self.server.port);
        if let Some(flag) = get("REPORTD_LOG_JSON") {
            self.server.log_json = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }
}

/// Parses a numeric override, keeping the current value when it is malformed
/// or not positive.
fn parse_into<T, G>(get: &G, key: &str, target: &mut T)
where
    T: FromStr + PartialOrd + Default,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => *target = value,
        _ => log::warn!("Ignoring invalid value '{}' for {}", raw, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overlay() {
        let mut settings = Settings::default();
        settings.apply_env_from(lookup(&[
            ("PYTHON_PATH", "/usr/bin/python3"),
            ("BACKEND_INSERT_SCRIPT", "backend/scripts/main.py"),
            ("DATA_FOLDER", "backend/data"),
            ("JOB_TIMEOUT_MINUTES", "5"),
            ("HISTORY_MAX_RECORDS", "25"),
            ("SIENGE_SUBDOMAIN", "acme"),
            ("SIENGE_TOKEN", "abc"),
            ("SIENGE_PAGE_SIZE", "200"),
            ("PORT", "8080"),
        ]));

        assert_eq!(settings.python_path.as_deref(), Some("/usr/bin/python3"));
        assert_eq!(
            settings.scripts.ingest,
            Some(PathBuf::from("backend/scripts/main.py"))
        );
        assert_eq!(settings.job_timeout_minutes, 5);
        assert_eq!(settings.history.max_records, 25);
        assert_eq!(settings.remote.subdomain.as_deref(), Some("acme"));
        assert!(settings.remote.token.is_configured());
        assert!(!settings.remote.basic_password.is_configured());
        assert_eq!(settings.remote.page_size, 200);
        assert_eq!(settings.server.port, 8080);
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let mut settings = Settings::default();
        settings.apply_env_from(lookup(&[
            ("JOB_TIMEOUT_MINUTES", "abc"),
            ("HISTORY_MAX_RECORDS", "0"),
            ("SIENGE_PAGE_SIZE", "-5"),
        ]));

        assert_eq!(settings.job_timeout_minutes, 30);
        assert_eq!(settings.history.max_records, 10);
        assert_eq!(settings.remote.page_size, 500);
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env_from(lookup(&[("DOWNLOADS_FOLDER", "  "), ("SIENGE_TOKEN", "")]));

        assert!(settings.downloads_folder.is_none());
        assert!(!settings.remote.token.is_configured());
    }

    #[test]
    fn test_load_settings_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "downloadsFolder": "out", "history": {{ "maxRecords": 4 }} }}"#
        )
        .unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.downloads_folder, Some(PathBuf::from("out")));
        assert_eq!(settings.history.max_records, 4);
    }

    #[test]
    fn test_load_settings_rejects_zero_history() {
        let err = load_settings_from_str(r#"{ "history": { "maxRecords": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_minutes_above_one_year_are_rejected() {
        let err = load_settings_from_str(r#"{ "jobs": { "ttlMinutes": 18446744073709551615 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JOB_TTL_MINUTES", .. }));

        let at_limit = format!(r#"{{ "jobTimeoutMinutes": {} }}"#, MAX_MINUTES);
        assert!(load_settings_from_str(&at_limit).is_ok());
    }

    #[test]
    fn test_environment_overlay_is_validated() {
        let err = load_layered(None, lookup(&[("JOB_TTL_MINUTES", "99999999999")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "JOB_TTL_MINUTES", .. }));

        let err = load_layered(None, lookup(&[("JOB_SWEEP_INTERVAL_MINUTES", "600000")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "JOB_SWEEP_INTERVAL_MINUTES", .. }
        ));
    }

    #[test]
    fn test_environment_can_repair_file_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "history": {{ "maxRecords": 0 }} }}"#).unwrap();

        assert!(load_settings(file.path()).is_err());
        assert!(load_layered(Some(file.path()), lookup(&[])).is_err());

        let settings =
            load_layered(Some(file.path()), lookup(&[("HISTORY_MAX_RECORDS", "5")])).unwrap();
        assert_eq!(settings.history.max_records, 5);
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    #[serial_test::serial]
    fn test_settings_from_process_environment() {
        std::env::set_var("REPORT_SCRIPT", "relatorio/generate_report.py");
        let settings = load_settings_with_env(None).unwrap();
        std::env::remove_var("REPORT_SCRIPT");

        assert_eq!(
            settings.scripts.generate,
            Some(PathBuf::from("relatorio/generate_report.py"))
        );
    }
}
