use serde::{Deserialize, Serialize};

/// Per-request model settings sent alongside the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
}

impl ModelParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.9,
            top_p: 0.7,
        }
    }

    /// Same settings, different model.
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }
}

/// Result of a completion round-trip, with the provider's usage accounting.
///
/// `completion_tokens == 0` marks a reply that must not be appended to the
/// transcript: either the gateway's degraded apology or a provider response
/// that carried no usable usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Completion {
    pub fn new(content: impl Into<String>, completion_tokens: u64, total_tokens: u64) -> Self {
        Self {
            content: content.into(),
            completion_tokens,
            total_tokens,
        }
    }

    /// Fixed user-facing fallback returned when every attempt failed.
    pub fn degraded(apology: impl Into<String>) -> Self {
        Self::new(apology, 0, 0)
    }

    pub fn has_usage(&self) -> bool {
        self.completion_tokens > 0
    }

    pub fn is_degraded(&self) -> bool {
        !self.has_usage()
    }
}
