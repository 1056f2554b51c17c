//! Shared application state injected into every handler.

use std::sync::Arc;

use reportd::{JobManager, Settings, SyncService};

pub struct AppState {
    pub settings: Arc<Settings>,
    pub manager: JobManager,
    pub sync: SyncService,
}

impl AppState {
    pub fn new(settings: Arc<Settings>, manager: JobManager) -> Self {
        let sync = SyncService::new(Arc::clone(&settings));
        Self {
            settings,
            manager,
            sync,
        }
    }
}
