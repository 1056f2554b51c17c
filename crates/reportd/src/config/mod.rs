pub mod loader;
pub mod schema;

pub use loader::{load_settings, load_settings_from_str, load_settings_with_env};
pub use schema::{
    HistorySettings, IngestSettings, JobSettings, RemoteSettings, ScriptSettings, SecretSource,
    ServerSettings, Settings,
};
