//! Authenticated HTTP client for the ERP bulk-data API.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::debug;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use super::error::{Result, SyncError};
use crate::config::RemoteSettings;
use crate::secrets::resolve_source;

/// Longest slice of an error response kept in [`SyncError::Http`].
pub const MAX_ERROR_BODY_CHARS: usize = 700;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

/// Builds the `Authorization` header value. Basic credentials take priority
/// over a bearer token.
pub fn authorization_header(remote: &RemoteSettings) -> Result<SecretString> {
    let user = remote.basic_user.as_deref().filter(|u| !u.is_empty());
    if let (Some(user), Some(password)) = (user, resolve_source(&remote.basic_password)?) {
        if !password.expose_secret().is_empty() {
            let encoded = STANDARD.encode(format!("{}:{}", user, password.expose_secret()));
            return Ok(SecretString::from(format!("Basic {}", encoded)));
        }
    }

    if let Some(token) = resolve_source(&remote.token)? {
        let token = token.expose_secret();
        if !token.is_empty() {
            let header = if token.starts_with("Bearer ") {
                token.to_string()
            } else {
                format!("Bearer {}", token)
            };
            return Ok(SecretString::from(header));
        }
    }

    Err(SyncError::AuthConfig)
}

/// Base URL of the tenant, e.g.
/// `https://api.sienge.com.br/acme/public/api/bulk-data/v1`.
pub fn base_url(remote: &RemoteSettings) -> Result<String> {
    if let Some(url) = remote.base_url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(url.trim_end_matches('/').to_string());
    }
    let subdomain = remote
        .subdomain
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(SyncError::MissingSetting("SIENGE_SUBDOMAIN"))?;
    Ok(format!(
        "https://{}/{}/public/api/bulk-data/v1",
        remote.base_domain, subdomain
    ))
}

pub struct RemoteClient {
    http: Client,
    base_url: String,
    authorization: SecretString,
    timeout: Duration,
}

impl RemoteClient {
    pub fn from_settings(remote: &RemoteSettings) -> Result<Self> {
        let authorization = authorization_header(remote)?;
        let base_url = base_url(remote)?;
        let timeout = remote.request_timeout();

        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Request {
                path: base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            http,
            base_url,
            authorization,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins the endpoint onto the base URL. Empty query values are skipped.
    pub fn build_url(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, endpoint);
        let mut url = Url::parse(&raw).map_err(|e| SyncError::InvalidUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        let params: Vec<_> = query.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn get_json(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.build_url(endpoint, query)?;
        let path = url.path().to_string();
        debug!("GET {}", url);

        let mut auth = HeaderValue::from_str(self.authorization.expose_secret())
            .map_err(|_| SyncError::AuthConfig)?;
        auth.set_sensitive(true);

        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| self.request_error(&path, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(&path, e))?;

        if !status.is_success() {
            return Err(SyncError::Http {
                status: status.as_u16(),
                path,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| SyncError::Parse {
            path,
            reason: e.to_string(),
        })
    }

    fn request_error(&self, path: &str, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::Timeout {
                path: path.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            SyncError::Request {
                path: path.to_string(),
                source: error,
            }
        }
    }
}
