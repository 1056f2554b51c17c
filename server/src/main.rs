//! reportd-server: HTTP entry point for report jobs.
//!
//! Startup order:
//! 1. Load settings (optional JSON file from `REPORTD_CONFIG`, then the
//!    environment).
//! 2. Initialise tracing and bridge `log` records into it.
//! 3. Build the job manager and start the expiry sweeper.
//! 4. Serve HTTP until Ctrl-C or SIGTERM, then stop the sweeper.

mod error;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use reportd::{load_settings_with_env, ExpirySweeper, JobManager, Settings};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

fn load_config() -> anyhow::Result<Settings> {
    let path = std::env::var("REPORTD_CONFIG")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);
    load_settings_with_env(path.as_deref()).with_context(|| match &path {
        Some(path) => format!("loading settings from {}", path.display()),
        None => "loading settings from the environment".to_string(),
    })
}

fn init_tracing(log_json: bool) -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("installing the log bridge")?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let installed = if log_json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("installing the tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Arc::new(load_config()?);
    init_tracing(settings.server.log_json)?;

    info!(version = env!("CARGO_PKG_VERSION"), "reportd-server starting");
    if !settings.remote.has_credentials() {
        warn!("no remote API credentials configured; syncBeforeRun jobs will fail");
    }

    let manager = JobManager::from_settings(Arc::clone(&settings));
    let sweeper = ExpirySweeper::for_manager(manager.clone());
    let sweeper_handle = sweeper.start();
    info!(
        ttl_secs = manager.options().ttl.as_secs(),
        sweep_secs = manager.options().sweep_interval.as_secs(),
        "job expiry sweeper started"
    );

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("invalid HOST/PORT")?;
    let state = Arc::new(AppState::new(Arc::clone(&settings), manager));
    let app = routes::build(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.stop();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "expiry sweeper task ended abnormally");
    }

    info!("reportd-server stopped");
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl-C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; draining connections");
}
