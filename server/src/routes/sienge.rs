//! Manual trigger for the remote ERP sync.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use reportd::SyncManifest;
use serde::Serialize;
use tracing::info;

use crate::error::ServerError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/sync", post(sync))
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub ok: bool,
    pub message: String,
    pub result: SyncManifest,
}

async fn sync(State(state): State<Arc<AppState>>) -> Result<Json<SyncResponse>, ServerError> {
    let manifest = state.sync.sync_all().await?;
    info!(
        files = manifest.files.len(),
        records = manifest.total_records(),
        "remote sync finished"
    );

    Ok(Json(SyncResponse {
        ok: true,
        message: "Remote sync completed".to_string(),
        result: manifest,
    }))
}
