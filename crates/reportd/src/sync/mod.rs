//! Remote ERP data sync: paginated fetch of the bulk-data datasets into
//! local JSON files consumed by the ingest script.

pub mod client;
pub mod error;
pub mod pagination;
pub mod service;
pub mod task;

pub use client::RemoteClient;
pub use error::SyncError;
pub use pagination::{fetch_all_pages, FetchedDataset, PageLimits, PageSource};
pub use service::{SyncManifest, SyncService, SyncedFile};
pub use task::{default_tasks, SyncTask};
