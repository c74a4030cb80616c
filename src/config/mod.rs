pub mod hot_reload;
pub mod schema;

pub use hot_reload::ConfigHandle;
pub use schema::{
    CommandsConfig, Config, DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, ProviderConfig,
    ReliabilityConfig, SessionConfig,
};
