//! Arch Insight LLM
//!
//! Provides a unified interface for the completion providers used by the
//! analysis pipeline:
//! - OpenAI (and OpenAI-compatible endpoints via `base_url`)
//! - Azure OpenAI deployments
//!
//! Also includes the HTTP client factory and the provider factory.

pub mod azure;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

use std::sync::Arc;

// Re-export main types
pub use azure::AzureOpenAIProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use types::*;

/// Build the provider selected by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        ProviderType::OpenAI => Ok(Arc::new(OpenAIProvider::new(config)?)),
        ProviderType::Azure => Ok(Arc::new(AzureOpenAIProvider::new(config)?)),
    }
}
