mod env_overrides;
mod loader;
mod types;

pub use types::{
    CommandsConfig, Config, DEFAULT_BASE_URL, DEFAULT_SYSTEM_PROMPT, ProviderConfig,
    ReliabilityConfig, SessionConfig,
};
