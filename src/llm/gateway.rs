use super::error::{FailureKind, ProviderError};
use super::traits::CompletionProvider;
use super::types::{Completion, ModelParams};
use crate::session::{Message, SessionRegistry, SharedSession};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_APOLOGY: &str =
    "Sorry, the assistant is unavailable right now. Please try again later.";

/// How long to wait before retrying, per failure class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub rate_limited: Duration,
    pub timeout: Duration,
    pub service_unavailable: Duration,
    pub connection_failed: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            rate_limited: Duration::from_secs(20),
            timeout: Duration::from_secs(5),
            service_unavailable: Duration::from_secs(10),
            connection_failed: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// `None` for failures that are never retried.
    pub fn delay_for(&self, kind: FailureKind) -> Option<Duration> {
        match kind {
            FailureKind::RateLimited => Some(self.rate_limited),
            FailureKind::Timeout => Some(self.timeout),
            FailureKind::ServiceUnavailable => Some(self.service_unavailable),
            FailureKind::ConnectionFailed => Some(self.connection_failed),
            FailureKind::Other => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    /// Deadline for a single provider round-trip.
    pub request_timeout: Duration,
    pub backoff: BackoffPolicy,
    /// Text returned to the user when no reply could be produced.
    pub apology: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            request_timeout: Duration::from_secs(60),
            backoff: BackoffPolicy::default(),
            apology: DEFAULT_APOLOGY.to_string(),
        }
    }
}

enum AttemptOutcome {
    Success(Completion),
    Retryable(ProviderError),
    Fatal(ProviderError),
    Cancelled,
}

/// Issues completion requests for a session with bounded, classified retries.
///
/// Raw provider errors never leave the gateway: callers get either the
/// provider's completion or [`Completion::degraded`] carrying the apology.
pub struct CompletionGateway {
    provider: Arc<dyn CompletionProvider>,
    registry: Arc<SessionRegistry>,
    params: ModelParams,
    config: GatewayConfig,
    shutdown: CancellationToken,
}

impl CompletionGateway {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        registry: Arc<SessionRegistry>,
        params: ModelParams,
        config: GatewayConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            params,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Abort in-flight requests and pending backoffs when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the session's transcript through the provider.
    ///
    /// Retryable failures are retried up to `max_retries` times after a
    /// class-specific backoff. An unclassified failure is not retried and
    /// evicts the session from the registry, so the next turn starts clean.
    pub async fn complete(
        &self,
        session: &SharedSession,
        model_override: Option<&str>,
    ) -> Completion {
        let (conversation, messages) = {
            let session = session.lock().unwrap_or_else(PoisonError::into_inner);
            (session.id().map(str::to_string), session.messages().to_vec())
        };
        let conversation_label = conversation.as_deref().unwrap_or("-");
        let params = match model_override {
            Some(model) => self.params.with_model(model),
            None => self.params.clone(),
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.attempt(&messages, &params).await {
                AttemptOutcome::Success(completion) => {
                    if attempt > 1 {
                        tracing::info!(
                            provider = self.provider.name(),
                            conversation = conversation_label,
                            attempt,
                            "Provider recovered after retries"
                        );
                    }
                    return completion;
                }
                AttemptOutcome::Fatal(err) => {
                    tracing::error!(
                        provider = self.provider.name(),
                        conversation = conversation_label,
                        kind = %err.kind,
                        "Unrecoverable provider error, discarding session: {}",
                        err.message
                    );
                    if let Some(id) = conversation.as_deref() {
                        self.registry.clear(id);
                    }
                    return self.degraded();
                }
                AttemptOutcome::Retryable(err) => {
                    let retries_used = attempt - 1;
                    if retries_used >= self.config.max_retries {
                        tracing::warn!(
                            provider = self.provider.name(),
                            conversation = conversation_label,
                            kind = %err.kind,
                            attempts = attempt,
                            "Retries exhausted: {}",
                            err.message
                        );
                        return self.degraded();
                    }
                    let delay = self.config.backoff.delay_for(err.kind).unwrap_or_default();
                    tracing::warn!(
                        provider = self.provider.name(),
                        conversation = conversation_label,
                        kind = %err.kind,
                        retry = attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Provider call failed, retrying: {}",
                        err.message
                    );
                    if !self.backoff(delay).await {
                        tracing::info!(
                            conversation = conversation_label,
                            "Shutdown requested during backoff"
                        );
                        return self.degraded();
                    }
                }
                AttemptOutcome::Cancelled => {
                    tracing::info!(
                        conversation = conversation_label,
                        "Shutdown requested during provider call"
                    );
                    return self.degraded();
                }
            }
        }
    }

    async fn attempt(&self, messages: &[Message], params: &ModelParams) -> AttemptOutcome {
        let deadline = self.config.request_timeout;
        let call = tokio::time::timeout(deadline, self.provider.complete(messages, params));
        let result = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => return AttemptOutcome::Cancelled,
            result = call => result,
        };
        match result {
            Ok(Ok(completion)) => AttemptOutcome::Success(completion),
            Ok(Err(err)) if err.is_retryable() => AttemptOutcome::Retryable(err),
            Ok(Err(err)) => AttemptOutcome::Fatal(err),
            Err(_elapsed) => AttemptOutcome::Retryable(ProviderError::new(
                FailureKind::Timeout,
                format!("no response within {}s", deadline.as_secs()),
            )),
        }
    }

    /// Wait out `delay`; `false` if shutdown interrupted the wait.
    async fn backoff(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }

    fn degraded(&self) -> Completion {
        Completion::degraded(self.config.apology.clone())
    }
}
