//! Azure OpenAI Provider
//!
//! Azure hosts OpenAI models behind per-resource endpoints. The model id in
//! configuration is the deployment name; authentication uses the `api-key`
//! header instead of a bearer token.

use async_trait::async_trait;

use super::openai::{build_request_body, execute_chat_request};
use super::provider::{missing_api_key_error, LlmProvider};
use super::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};
use crate::http_client::build_http_client;

/// REST API version used when none is configured
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

/// Azure OpenAI provider
pub struct AzureOpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
    url: String,
}

impl AzureOpenAIProvider {
    /// Create a new Azure provider. The endpoint comes from `base_url`.
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let endpoint = config
            .base_url
            .as_deref()
            .ok_or_else(|| LlmError::InvalidRequest {
                message: "Azure OpenAI endpoint is required when using the azure provider"
                    .to_string(),
            })?;
        let api_version = config
            .api_version
            .as_deref()
            .unwrap_or(DEFAULT_AZURE_API_VERSION);
        let url = deployment_url(endpoint, &config.model, api_version);
        let client = build_http_client(config.proxy_url.as_deref())?;
        Ok(Self {
            config,
            client,
            url,
        })
    }

    /// Fully qualified chat-completions URL for the configured deployment.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn deployment_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(deployment),
        urlencoding::encode(api_version)
    )
}

#[async_trait]
impl LlmProvider for AzureOpenAIProvider {
    fn name(&self) -> &'static str {
        "azure"
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
            .ok_or_else(|| missing_api_key_error("azure"))?;

        // The deployment in the URL selects the model.
        let body = build_request_body(
            &self.config,
            &messages,
            system.as_deref(),
            &request_options,
            false,
        );

        let request = self.client.post(&self.url).header("api-key", api_key);
        execute_chat_request(request, &body, "azure").await
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
