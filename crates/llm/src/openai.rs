//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI-compatible
//! chat-completions endpoints. The Azure provider reuses the request body
//! builder and response parsing defined here.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{missing_api_key_error, parse_http_error, retry_after_header, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    UsageStats,
};
use crate::http_client::build_http_client;

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy_url.as_deref())?;
        Ok(Self { config, client })
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }
}

/// Build the chat-completions request body.
///
/// Model id and output limit are passed through from configuration as-is.
pub(crate) fn build_request_body(
    config: &ProviderConfig,
    messages: &[Message],
    system: Option<&str>,
    request_options: &LlmRequestOptions,
    include_model: bool,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "max_tokens": request_options.max_tokens_override.unwrap_or(config.max_tokens),
        "temperature": request_options
            .temperature_override
            .unwrap_or(config.temperature),
    });
    if include_model {
        body["model"] = serde_json::json!(config.model);
    }

    let mut openai_messages: Vec<serde_json::Value> = Vec::new();
    if let Some(sys) = system {
        openai_messages.push(serde_json::json!({
            "role": "system",
            "content": sys
        }));
    }
    for msg in messages {
        openai_messages.push(serde_json::json!({
            "role": msg.role.as_str(),
            "content": msg.content
        }));
    }
    body["messages"] = serde_json::json!(openai_messages);
    body
}

/// Send a prepared request and map the HTTP result onto `LlmResult`.
pub(crate) async fn execute_chat_request(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
    provider: &str,
) -> LlmResult<LlmResponse> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

    let status = response.status().as_u16();
    let retry_after = retry_after_header(response.headers());
    let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
        message: e.to_string(),
    })?;

    tracing::debug!(provider, status, bytes = body_text.len(), "chat completion response");

    if status != 200 {
        return Err(parse_http_error(status, &body_text, provider, retry_after));
    }

    let parsed: ChatCompletionResponse =
        serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse response: {}", e),
        })?;

    Ok(parse_response(&parsed))
}

/// Parse a response from a chat-completions API
pub(crate) fn parse_response(response: &ChatCompletionResponse) -> LlmResponse {
    let choice = response.choices.first();

    let content = choice
        .and_then(|c| c.message.as_ref())
        .and_then(|m| m.content.clone());

    let stop_reason = choice
        .and_then(|c| c.finish_reason.as_ref())
        .map(|r| StopReason::from(r.as_str()))
        .unwrap_or(StopReason::EndTurn);

    let usage = response
        .usage
        .as_ref()
        .map(|u| UsageStats {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    LlmResponse {
        content,
        stop_reason,
        usage,
        model: response.model.clone().unwrap_or_default(),
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = build_request_body(
            &self.config,
            &messages,
            system.as_deref(),
            &request_options,
            true,
        );

        let request = self
            .client
            .post(self.base_url())
            .header("Authorization", format!("Bearer {}", api_key));

        execute_chat_request(request, &body, "openai").await
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}
