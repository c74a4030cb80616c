use super::budget::{BudgetOutcome, CharRatioEstimator, TokenEstimator};
use super::types::{Message, MessageRole};
use std::sync::Arc;

/// One end-user conversation: the current system prompt and the ordered
/// transcript sent to the completion provider.
///
/// `messages[0]` is always the system message built from `system_prompt`;
/// user and assistant messages follow in arrival order.
pub struct Session {
    id: Option<String>,
    system_prompt: String,
    messages: Vec<Message>,
    estimator: Option<Arc<dyn TokenEstimator>>,
}

impl Session {
    /// Build a freshly reset session using the default token estimator.
    ///
    /// A session without an `id` is ephemeral: it lives for one request and
    /// is never stored.
    pub fn new(id: Option<String>, system_prompt: impl Into<String>) -> Self {
        let mut session = Self {
            id,
            system_prompt: system_prompt.into(),
            messages: Vec::new(),
            estimator: Some(Arc::new(CharRatioEstimator::default())),
        };
        session.reset();
        session
    }

    /// Replace the token estimator. `None` turns budget enforcement into a no-op.
    pub fn with_estimator(mut self, estimator: Option<Arc<dyn TokenEstimator>>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_ephemeral(&self) -> bool {
        self.id.is_none()
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drop all history, leaving only the system message.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.messages.push(Message::system(self.system_prompt.clone()));
    }

    /// Switch persona. Prior history is discarded, not edited.
    pub fn set_system_prompt(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = system_prompt.into();
        self.reset();
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Trim the oldest non-system messages until the transcript fits in
    /// `max_tokens`.
    ///
    /// `known_usage` is the provider's exact count for the transcript as it
    /// currently stands; without it the whole transcript is estimated. Each
    /// dropped message is credited at its estimated cost. The system message
    /// and a lone trailing user message are never dropped.
    pub fn enforce_budget(
        &mut self,
        max_tokens: usize,
        known_usage: Option<usize>,
    ) -> BudgetOutcome {
        let Some(estimator) = self.estimator.clone() else {
            tracing::warn!(
                conversation = self.id.as_deref().unwrap_or("-"),
                "Token accounting unavailable; skipping budget enforcement"
            );
            return BudgetOutcome::Unavailable;
        };

        let mut tokens = known_usage.unwrap_or_else(|| estimator.estimate(&self.messages));
        let mut removed = 0;

        while tokens > max_tokens {
            let droppable = match self.messages.len() {
                0 | 1 => false,
                2 => self.messages[1].role == MessageRole::Assistant,
                _ => true,
            };
            if !droppable {
                tracing::warn!(
                    conversation = self.id.as_deref().unwrap_or("-"),
                    tokens,
                    max_tokens,
                    "Latest message alone exceeds the context budget"
                );
                return BudgetOutcome::Exceeded { removed, tokens };
            }
            let dropped = self.messages.remove(1);
            tokens = tokens.saturating_sub(estimator.estimate_message(&dropped));
            removed += 1;
        }

        if removed == 0 {
            BudgetOutcome::Within { tokens }
        } else {
            tracing::debug!(
                conversation = self.id.as_deref().unwrap_or("-"),
                removed,
                tokens,
                max_tokens,
                "Trimmed transcript to fit context budget"
            );
            BudgetOutcome::Trimmed { removed, tokens }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("messages", &self.messages.len())
            .field("budgeted", &self.estimator.is_some())
            .finish_non_exhaustive()
    }
}
