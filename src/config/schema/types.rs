use crate::error::ConfigError;
use crate::llm::{BackoffPolicy, DEFAULT_APOLOGY, GatewayConfig, ModelParams};
use crate::store::Ttl;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a customer-support assistant that helps users \
     solve their problems. When asked who you are, answer: I am the support assistant, how can \
     I help you?";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - set by the loader, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    pub api_key: Option<String>,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub reliability: ReliabilityConfig,

    #[serde(default)]
    pub commands: CommandsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.toml"),
            api_key: None,
            provider: ProviderConfig::default(),
            session: SessionConfig::default(),
            reliability: ReliabilityConfig::default(),
            commands: CommandsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_open_unit = |v: f64| v > 0.0 && v < 1.0;
        if !in_open_unit(self.provider.temperature) {
            return Err(ConfigError::Validation(format!(
                "provider.temperature must be in (0, 1), got {}",
                self.provider.temperature
            )));
        }
        if !in_open_unit(self.provider.top_p) {
            return Err(ConfigError::Validation(format!(
                "provider.top_p must be in (0, 1), got {}",
                self.provider.top_p
            )));
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigError::Validation("provider.model must not be empty".into()));
        }
        if self.provider.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "provider.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.session.max_context_tokens == 0 {
            return Err(ConfigError::Validation(
                "session.max_context_tokens must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn model_params(&self) -> ModelParams {
        ModelParams {
            model: self.provider.model.clone(),
            temperature: self.provider.temperature,
            top_p: self.provider.top_p,
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        let r = &self.reliability;
        GatewayConfig {
            max_retries: r.max_retries,
            request_timeout: Duration::from_secs(self.provider.request_timeout_secs),
            backoff: BackoffPolicy {
                rate_limited: Duration::from_secs(r.rate_limit_backoff_secs),
                timeout: Duration::from_secs(r.timeout_backoff_secs),
                service_unavailable: Duration::from_secs(r.service_unavailable_backoff_secs),
                connection_failed: Duration::from_secs(r.connection_backoff_secs),
            },
            apology: r.apology.clone(),
        }
    }
}

// ── Provider ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_model() -> String {
    "glm-4".into()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_top_p() -> f64 {
    0.7
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Session ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle seconds before a conversation is forgotten. Unset or 0 keeps
    /// conversations until cleared.
    #[serde(default)]
    pub idle_expiry_secs: Option<u64>,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
    /// Period of the background purge of expired conversations.
    #[serde(default)]
    pub sweep_interval_secs: Option<u64>,
}

fn default_max_context_tokens() -> usize {
    1000
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_expiry_secs: None,
            max_context_tokens: default_max_context_tokens(),
            default_system_prompt: default_system_prompt(),
            sweep_interval_secs: None,
        }
    }
}

impl SessionConfig {
    pub fn ttl(&self) -> Ttl {
        Ttl::from_secs(self.idle_expiry_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        self.sweep_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

// ── Reliability ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,
    #[serde(default = "default_timeout_backoff_secs")]
    pub timeout_backoff_secs: u64,
    #[serde(default = "default_service_unavailable_backoff_secs")]
    pub service_unavailable_backoff_secs: u64,
    #[serde(default = "default_connection_backoff_secs")]
    pub connection_backoff_secs: u64,
    #[serde(default = "default_apology")]
    pub apology: String,
}

fn default_max_retries() -> u32 {
    2
}

fn default_rate_limit_backoff_secs() -> u64 {
    20
}

fn default_timeout_backoff_secs() -> u64 {
    5
}

fn default_service_unavailable_backoff_secs() -> u64 {
    10
}

fn default_connection_backoff_secs() -> u64 {
    5
}

fn default_apology() -> String {
    DEFAULT_APOLOGY.into()
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
            timeout_backoff_secs: default_timeout_backoff_secs(),
            service_unavailable_backoff_secs: default_service_unavailable_backoff_secs(),
            connection_backoff_secs: default_connection_backoff_secs(),
            apology: default_apology(),
        }
    }
}

// ── In-band commands ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    #[serde(default = "default_clear_memory_commands")]
    pub clear_memory: Vec<String>,
    #[serde(default = "default_clear_all_command")]
    pub clear_all: String,
    #[serde(default = "default_reload_config_command")]
    pub reload_config: String,
}

fn default_clear_memory_commands() -> Vec<String> {
    vec!["#clear".into()]
}

fn default_clear_all_command() -> String {
    "#clear_all".into()
}

fn default_reload_config_command() -> String {
    "#reload_config".into()
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            clear_memory: default_clear_memory_commands(),
            clear_all: default_clear_all_command(),
            reload_config: default_reload_config_command(),
        }
    }
}
