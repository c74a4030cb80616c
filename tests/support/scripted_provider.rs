use chatkeep::llm::{
    Completion, CompletionFuture, CompletionProvider, FailureKind, ModelParams, ProviderError,
};
use chatkeep::session::Message;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays a fixed list of outcomes, then keeps answering with `fallback`.
/// Every transcript it receives is kept for assertions.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    fallback: Completion,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<Message>, String)>>,
}

impl ScriptedProvider {
    pub fn answering(content: &str, total_tokens: u64) -> Self {
        Self::new(Vec::new(), Completion::new(content, 1, total_tokens))
    }

    pub fn new(script: Vec<Result<Completion, ProviderError>>, fallback: Completion) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> (Vec<Message>, String) {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("provider was never called")
    }
}

pub fn failure(kind: FailureKind) -> Result<Completion, ProviderError> {
    Err(ProviderError::new(kind, format!("scripted {kind}")))
}

impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a ModelParams,
    ) -> CompletionFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), params.model.clone()));
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()));
        Box::pin(async move { next })
    }
}
