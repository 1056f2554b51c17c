//! Handler error type.
//!
//! Every handler returns `Result<T, ServerError>`; the [`IntoResponse`]
//! impl turns it into a JSON `{"error": ...}` body with a matching status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reportd::{ConfigError, DownloadError, RequestError, SyncError};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match &self {
            ServerError::Request(RequestError::InvalidFormat(_)) => {
                debug!(error = %message, "rejected report request");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ServerError::Request(RequestError::JobNotFound(_)) => {
                debug!(error = %message, "unknown job");
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ServerError::Download(DownloadError::NotFound(_)) => {
                warn!(error = %message, "download not found");
                (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
            }
            ServerError::Download(DownloadError::AccessDenied(_)) => {
                warn!(error = %message, "download outside the downloads folder");
                (StatusCode::FORBIDDEN, Json(json!({ "error": message }))).into_response()
            }
            ServerError::Sync(_) => {
                error!(error = %message, "remote sync failed");
                let body = json!({ "ok": false, "error": message });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ServerError::Download(DownloadError::Io { .. })
            | ServerError::Config(_)
            | ServerError::Internal(_) => {
                error!(error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message })))
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ServerError::from(RequestError::InvalidFormat("pdf".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(RequestError::JobNotFound("x".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(DownloadError::NotFound("a.csv".into())),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(DownloadError::AccessDenied("../a".into())),
                StatusCode::FORBIDDEN,
            ),
            (
                ServerError::from(SyncError::AuthConfig),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServerError::from(ConfigError::Missing {
                    name: "DOWNLOADS_FOLDER",
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
