use strum::Display;
use thiserror::Error;

/// Closed taxonomy of provider failures.
///
/// Everything the gateway knows how to recover from has its own variant;
/// anything else is [`FailureKind::Other`] and is treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Timeout,
    ServiceUnavailable,
    ConnectionFailed,
    Other,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Map an HTTP status code returned by a provider.
    pub fn from_status(code: u16) -> Self {
        match code {
            429 => Self::RateLimited,
            408 | 504 => Self::Timeout,
            500 | 502 | 503 => Self::ServiceUnavailable,
            _ => Self::Other,
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ConnectionFailed
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16())
        } else {
            Self::Other
        }
    }
}

/// A failed provider round-trip, already classified.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(FailureKind::from_reqwest(&err), err.to_string())
    }
}
