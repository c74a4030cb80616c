// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod error;
pub mod http_client;
pub mod traits;
pub mod types;

// ── Reliability layer ───────────────────────────────────────────────────────
pub mod gateway;

// ── Provider implementations ────────────────────────────────────────────────
pub mod compatible;

pub use error::{FailureKind, ProviderError};
pub use gateway::{BackoffPolicy, CompletionGateway, DEFAULT_APOLOGY, GatewayConfig};
pub use http_client::build_provider_client;
pub use traits::{CompletionFuture, CompletionProvider};
pub use types::{Completion, ModelParams};

pub use compatible::OpenAiCompatibleProvider;
