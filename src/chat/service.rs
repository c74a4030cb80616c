use super::commands::{Command, parse_command};
use crate::config::ConfigHandle;
use crate::llm::{CompletionGateway, CompletionProvider};
use crate::session::{Session, SessionRegistry, SharedSession};
use crate::utils::text::preview;
use std::sync::{Arc, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

const LOG_PREVIEW_CHARS: usize = 80;

/// What the caller shows the user after a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Model output.
    Text(String),
    /// Acknowledgement of an in-band command.
    Info(String),
    /// The turn produced no model output; the text is safe to show.
    Error(String),
}

impl Reply {
    pub fn content(&self) -> &str {
        match self {
            Self::Text(s) | Self::Info(s) | Self::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// One inbound user message.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub conversation: Option<String>,
    pub text: String,
    pub system_prompt: Option<String>,
    pub model: Option<String>,
}

impl TurnRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn conversation(mut self, id: impl Into<String>) -> Self {
        self.conversation = Some(id.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Entry point for callers: routes in-band commands, keeps each
/// conversation's transcript within budget and asks the gateway for the
/// next assistant message.
///
/// Command words and `max_context_tokens` are read from the live config on
/// every turn. Provider, retry and expiry settings are fixed at construction.
pub struct ChatService {
    registry: Arc<SessionRegistry>,
    gateway: CompletionGateway,
    config: ConfigHandle,
}

impl ChatService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        gateway: CompletionGateway,
        config: ConfigHandle,
    ) -> Self {
        Self {
            registry,
            gateway,
            config,
        }
    }

    /// Wire a registry and gateway from the current config snapshot.
    pub fn from_config(
        config: ConfigHandle,
        provider: Arc<dyn CompletionProvider>,
        shutdown: CancellationToken,
    ) -> Self {
        let snapshot = config.load_full();
        let registry = Arc::new(SessionRegistry::with_default_factory(
            snapshot.session.ttl(),
            snapshot.session.default_system_prompt.clone(),
        ));
        let gateway = CompletionGateway::new(
            provider,
            Arc::clone(&registry),
            snapshot.model_params(),
            snapshot.gateway_config(),
        )
        .with_shutdown(shutdown);
        Self::new(registry, gateway, config)
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub async fn handle_turn(
        &self,
        conversation: Option<&str>,
        text: &str,
        system_prompt: Option<&str>,
    ) -> Reply {
        self.handle(TurnRequest {
            conversation: conversation.map(str::to_string),
            text: text.to_string(),
            system_prompt: system_prompt.map(str::to_string),
            model: None,
        })
        .await
    }

    pub async fn handle(&self, request: TurnRequest) -> Reply {
        let turn_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "turn",
            id = %turn_id,
            conversation = request.conversation.as_deref().unwrap_or("-")
        );
        self.handle_inner(request).instrument(span).await
    }

    async fn handle_inner(&self, request: TurnRequest) -> Reply {
        let config = self.config.load_full();
        if let Some(command) = parse_command(&request.text, &config.commands) {
            return self.run_command(command, request.conversation.as_deref());
        }

        tracing::debug!(
            text = %preview(&request.text, LOG_PREVIEW_CHARS),
            model = request.model.as_deref().unwrap_or(&self.gateway.params().model),
            "Handling turn"
        );

        let max_tokens = config.session.max_context_tokens;
        let session = self.registry.get_or_create(
            request.conversation.as_deref(),
            request.system_prompt.as_deref(),
        );
        let prompt_outcome = with_session(&session, |s| {
            s.append_user(request.text.as_str());
            s.enforce_budget(max_tokens, None)
        });
        tracing::debug!(trimmed = prompt_outcome.removed(), "Prompt budget checked");

        let completion = self
            .gateway
            .complete(&session, request.model.as_deref())
            .await;

        if completion.is_degraded() {
            tracing::debug!("Turn produced no model output");
            return if completion.content.is_empty() {
                Reply::Error(self.gateway.config().apology.clone())
            } else {
                Reply::Error(completion.content)
            };
        }

        let known_usage = usize::try_from(completion.total_tokens).unwrap_or(usize::MAX);
        let outcome = with_session(&session, |s| {
            s.append_assistant(completion.content.as_str());
            s.enforce_budget(max_tokens, Some(known_usage))
        });
        tracing::debug!(
            completion_tokens = completion.completion_tokens,
            total_tokens = completion.total_tokens,
            trimmed = outcome.removed(),
            "Turn complete"
        );
        Reply::Text(completion.content)
    }

    fn run_command(&self, command: Command, conversation: Option<&str>) -> Reply {
        match command {
            Command::ClearMemory => {
                if let Some(id) = conversation {
                    self.clear_conversation(id);
                }
                Reply::Info("Memory cleared".into())
            }
            Command::ClearAll => {
                self.clear_all();
                Reply::Info("All memories cleared".into())
            }
            Command::ReloadConfig => match self.config.reload() {
                Ok(()) => Reply::Info("Config reloaded".into()),
                Err(err) => {
                    tracing::warn!("Config reload rejected: {err:#}");
                    Reply::Error(format!("Config reload failed: {err}"))
                }
            },
        }
    }

    pub fn clear_conversation(&self, id: &str) {
        self.registry.clear(id);
        tracing::info!(conversation = id, "Conversation cleared");
    }

    pub fn clear_all(&self) {
        self.registry.clear_all();
        tracing::info!("All conversations cleared");
    }
}

fn with_session<R>(session: &SharedSession, f: impl FnOnce(&mut Session) -> R) -> R {
    let mut guard = session.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}
