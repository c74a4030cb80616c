use super::types::Message;

/// Approximates how many provider tokens a message costs.
///
/// Implementations are provider-specific; the transcript only needs a
/// per-message figure so it can tell how much each trimmed message frees.
pub trait TokenEstimator: Send + Sync {
    fn estimate_message(&self, message: &Message) -> usize;

    fn estimate(&self, messages: &[Message]) -> usize {
        messages.iter().map(|m| self.estimate_message(m)).sum()
    }
}

/// Rough heuristic: about four characters per token plus a fixed
/// per-message framing overhead.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioEstimator {
    pub chars_per_token: usize,
    pub per_message_overhead: usize,
}

impl Default for CharRatioEstimator {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            per_message_overhead: 4,
        }
    }
}

impl TokenEstimator for CharRatioEstimator {
    fn estimate_message(&self, message: &Message) -> usize {
        let chars = message.content.chars().count();
        chars.div_ceil(self.chars_per_token.max(1)) + self.per_message_overhead
    }
}

/// What a budget pass did to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetOutcome {
    /// Already within budget; nothing removed.
    Within { tokens: usize },
    /// Oldest history was dropped and the transcript now fits.
    Trimmed { removed: usize, tokens: usize },
    /// Still over budget with nothing left to drop but the latest user turn.
    Exceeded { removed: usize, tokens: usize },
    /// No token accounting available; the transcript was left untouched.
    Unavailable,
}

impl BudgetOutcome {
    pub fn removed(self) -> usize {
        match self {
            Self::Trimmed { removed, .. } | Self::Exceeded { removed, .. } => removed,
            Self::Within { .. } | Self::Unavailable => 0,
        }
    }

    pub fn tokens(self) -> Option<usize> {
        match self {
            Self::Within { tokens }
            | Self::Trimmed { tokens, .. }
            | Self::Exceeded { tokens, .. } => Some(tokens),
            Self::Unavailable => None,
        }
    }
}
