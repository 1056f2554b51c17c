//! Periodic removal of expired jobs.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::manager::JobManager;

/// Runs [`JobManager::sweep_expired`] on a fixed interval until stopped.
pub struct ExpirySweeper {
    manager: JobManager,
    interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl ExpirySweeper {
    pub fn new(manager: JobManager, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    pub fn for_manager(manager: JobManager) -> Self {
        let interval = manager.options().sweep_interval;
        Self::new(manager, interval)
    }

    /// Spawns the sweep loop on the current tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        let manager = self.manager.clone();
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            timer.tick().await; // skip immediate first tick

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let removed = manager.sweep_expired();
                        if removed > 0 {
                            log::info!(
                                "Expiry sweep removed {} job(s), {} still tracked",
                                removed,
                                manager.job_count()
                            );
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            log::debug!("Expiry sweeper stopped");
        })
    }

    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::history::HistoryStore;
    use crate::jobs::manager::JobManagerOptions;
    use crate::jobs::steps::ExternalSteps;
    use std::sync::Arc;

    fn manager(ttl: Duration) -> (tempfile::TempDir, JobManager) {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(Settings::default());
        let manager = JobManager::new(
            Arc::new(ExternalSteps::from_settings(settings)),
            Arc::new(HistoryStore::new(dir.path().join("history.json"), 10)),
            JobManagerOptions {
                ttl,
                sweep_interval: Duration::from_millis(20),
                estimated_total_records: 0,
            },
        );
        (dir, manager)
    }

    #[tokio::test]
    async fn test_sweeper_evicts_and_stops() {
        let (_dir, manager) = manager(Duration::ZERO);
        // Scripts are unconfigured, so the job fails fast; eviction ignores status.
        let job = manager.create_job(crate::jobs::ReportFormat::Csv, Default::default());

        let sweeper = ExpirySweeper::for_manager(manager.clone());
        let handle = sweeper.start();

        let mut evicted = false;
        for _ in 0..100 {
            if manager.get_job(&job.job_id).is_err() {
                evicted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(evicted);

        sweeper.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
