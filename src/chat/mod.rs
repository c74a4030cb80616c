pub mod commands;
pub mod service;

pub use commands::{Command, parse_command};
pub use service::{ChatService, Reply, TurnRequest};
