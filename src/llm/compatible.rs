//! OpenAI-compatible chat completions adapter.
//! Zhipu GLM, OpenAI, Moonshot, DeepSeek and most hosted gateways accept the
//! same `/chat/completions` request shape.

use super::error::{FailureKind, ProviderError};
use super::gateway::GatewayConfig;
use super::http_client::build_provider_client;
use super::traits::{CompletionFuture, CompletionProvider};
use super::types::{Completion, ModelParams};
use crate::session::Message;
use crate::utils::text::preview;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ERROR_BODY_PREVIEW_CHARS: usize = 200;

pub struct OpenAiCompatibleProvider {
    name: String,
    api_key: Option<String>,
    /// Pre-computed chat completions URL (avoids `format!` per request).
    chat_url: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    /// Adapter with a client sized for the gateway's default request deadline.
    pub fn new(name: &str, base_url: &str, api_key: Option<&str>) -> Self {
        let client = build_provider_client(GatewayConfig::default().request_timeout);
        Self::with_client(name, base_url, api_key, client)
    }

    pub fn with_client(
        name: &str,
        base_url: &str,
        api_key: Option<&str>,
        client: Client,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let chat_url = if base_url.ends_with("chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };
        Self {
            name: name.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
            chat_url,
            client,
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    async fn send(
        &self,
        messages: &[Message],
        params: &ModelParams,
    ) -> Result<Completion, ProviderError> {
        let Some(api_key) = &self.api_key else {
            return Err(ProviderError::new(
                FailureKind::Other,
                format!("{} API key not set", self.name),
            ));
        };

        let request = ChatRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
        };

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                FailureKind::from_status(status.as_u16()),
                format!(
                    "{} API error ({status}): {}",
                    self.name,
                    preview(&body, ERROR_BODY_PREVIEW_CHARS)
                ),
            ));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                FailureKind::Other,
                format!("{} chat completions JSON decode failed: {e}", self.name),
            )
        })?;
        into_completion(body, &self.name)
    }
}

impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn complete<'a>(
        &'a self,
        messages: &'a [Message],
        params: &'a ModelParams,
    ) -> CompletionFuture<'a> {
        Box::pin(self.send(messages, params))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    total_tokens: Option<u64>,
}

fn into_completion(
    response: ChatResponse,
    provider_name: &str,
) -> Result<Completion, ProviderError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            ProviderError::new(
                FailureKind::Other,
                format!("No response from {provider_name}"),
            )
        })?;

    // Missing usage is passed through as zero so the caller can tell a
    // usage-less reply apart from a normal one.
    let (completion_tokens, total_tokens) = response.usage.map_or((0, 0), |usage| {
        let total = usage
            .total_tokens
            .unwrap_or(usage.prompt_tokens + usage.completion_tokens);
        (usage.completion_tokens, total)
    });

    Ok(Completion::new(content, completion_tokens, total_tokens))
}
