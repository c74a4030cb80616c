#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod store;
pub mod utils;

pub use chat::{ChatService, Reply, TurnRequest};
pub use config::{Config, ConfigHandle};
pub use error::{ChatkeepError, ConfigError, Result};
pub use llm::{CompletionGateway, CompletionProvider, OpenAiCompatibleProvider};
pub use session::{Session, SessionRegistry};
pub use store::{ExpiringStore, Ttl};
