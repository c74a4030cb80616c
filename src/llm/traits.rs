use super::error::ProviderError;
use super::types::{Completion, ModelParams};
use crate::session::Message;
use std::future::Future;
use std::pin::Pin;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Completion, ProviderError>> + Send + 'a>>;

/// A service that turns a transcript into the next assistant message.
///
/// Implementations classify their own failures; the gateway decides what
/// to retry.
pub trait CompletionProvider: Send + Sync {
    /// Provider identifier used in logs (e.g. "zhipuai", "openai").
    fn name(&self) -> &str;

    fn complete<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a ModelParams,
    ) -> CompletionFuture<'a>;
}
