//! Report job endpoints under `/api/reports`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use reportd::{CreateJobOptions, HistoryEntry, Job, JobProgressEvent, JobStatus, ReportFormat};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate_report))
        .route("/jobs/{job_id}", get(get_job))
        .route("/jobs/{job_id}/events", get(job_events))
        .route("/history", get(get_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub formato: Option<String>,
    #[serde(default)]
    pub sync_before_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let format: ReportFormat = req
        .formato
        .as_deref()
        .unwrap_or_default()
        .parse()?;

    let job = state.manager.create_job(
        format,
        CreateJobOptions {
            sync_before_run: req.sync_before_run,
        },
    );
    info!(job_id = %job.job_id, format = %format, "report requested");

    Ok(Json(GenerateResponse {
        job_id: job.job_id,
        status: job.status,
        message: "Report is being generated...".to_string(),
        created_at: job.timing.start_time,
    }))
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ServerError> {
    Ok(Json(state.manager.get_job(&job_id)?))
}

async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<HistoryEntry>> {
    Json(state.manager.history().get_history().await)
}

/// Streams progress events for one job as server-sent events, starting
/// with its current snapshot and ending after the terminal event.
async fn job_events(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ServerError> {
    // Subscribe before reading the snapshot so no update falls in between.
    let receiver = state.manager.broadcaster().subscribe();
    let job = state.manager.get_job(&job_id)?;
    let initial = JobProgressEvent::from_job(&job);

    let updates = BroadcastStream::new(receiver).filter_map(move |msg| match msg {
        Ok(event) if event.job_id == job_id => Some(event),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            debug!(skipped, "progress subscriber lagged");
            None
        }
    });

    // Ends right after the terminal event; a finished job broadcasts nothing
    // further.
    let events = futures_util::stream::unfold(
        (Some(initial), Box::pin(updates), false),
        |(pending, mut updates, finished)| async move {
            if finished {
                return None;
            }
            let event = match pending {
                Some(event) => event,
                None => updates.next().await?,
            };
            let finished = event.is_terminal();
            Some((event, (None, updates, finished)))
        },
    )
    .map(|event| Event::default().event("progress").json_data(&event));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
