//! Analyzer Settings
//!
//! Configuration consumed by the analysis pipeline. Values are layered:
//! built-in defaults, an optional TOML file, environment overrides, then
//! command-line flags (applied by the CLI layer).

use std::path::Path;

use arch_insight_llm::{ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

/// Environment variable overriding the model id / deployment name.
pub const ENV_MODEL: &str = "ARCH_INSIGHT_MODEL";
/// Environment variable overriding the provider (`openai` or `azure`).
pub const ENV_PROVIDER: &str = "ARCH_INSIGHT_PROVIDER";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_AZURE_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_AZURE_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// Every option the analysis pipeline recognizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Files analyzed per run; the rest of the discovery list is skipped.
    pub max_files: usize,
    /// Concurrent external model calls.
    pub max_concurrent_calls: usize,
    /// Concurrent per-file tasks.
    pub worker_pool_size: usize,
    pub per_call_timeout_ms: u64,
    pub max_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Provider attempts allowed per `rate_limit_period_ms`; 0 disables.
    pub rate_limit_calls: u32,
    pub rate_limit_period_ms: u64,
    pub global_timeout_ms: u64,
    /// Source characters sent per prompt unit.
    pub content_char_budget: usize,
    /// Prompt units per file before the remaining source is dropped.
    pub max_chunks: usize,
    pub model_id: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub provider: ProviderType,
    /// OpenAI base URL override, or the Azure resource endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// File extensions to analyze, with or without the leading dot.
    pub extensions: Vec<String>,
    /// Globs matched against root-relative paths.
    pub exclude_globs: Vec<String>,
    pub max_file_size_bytes: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_files: 20,
            max_concurrent_calls: 5,
            worker_pool_size: 8,
            per_call_timeout_ms: 60_000,
            max_retries: 2,
            base_backoff_ms: 1_000,
            max_backoff_ms: 10_000,
            rate_limit_calls: 60,
            rate_limit_period_ms: 60_000,
            global_timeout_ms: 600_000,
            content_char_budget: 12_000,
            max_chunks: 1,
            model_id: "gpt-4o".to_string(),
            max_output_tokens: 1_000,
            temperature: 0.3,
            provider: ProviderType::OpenAI,
            base_url: None,
            proxy_url: None,
            extensions: vec![".java".to_string()],
            exclude_globs: vec![
                "**/target/**".to_string(),
                "**/build/**".to_string(),
                "**/out/**".to_string(),
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/*.test.java".to_string(),
                "**/*.spec.java".to_string(),
            ],
            max_file_size_bytes: 1_000_000,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, overlaid by the TOML file when one is given.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AppError::config(format!("cannot read {}: {}", path.display(), e))
                })?;
                Self::from_toml_str(&raw)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(raw: &str) -> AppResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply non-secret environment overrides.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.model_id = model.trim().to_string();
        }
        if let Some(provider) = lookup(ENV_PROVIDER).filter(|v| !v.trim().is_empty()) {
            self.provider = provider.parse()?;
        }
        if self.provider == ProviderType::Azure && self.base_url.is_none() {
            self.base_url = lookup(ENV_AZURE_ENDPOINT).filter(|v| !v.trim().is_empty());
        }
        Ok(())
    }

    /// Reject configurations that cannot schedule any work.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_concurrent_calls == 0 {
            return Err(AppError::config("max_concurrent_calls must be at least 1"));
        }
        if self.worker_pool_size == 0 {
            return Err(AppError::config("worker_pool_size must be at least 1"));
        }
        if self.content_char_budget == 0 {
            return Err(AppError::config("content_char_budget must be at least 1"));
        }
        if self.max_chunks == 0 {
            return Err(AppError::config("max_chunks must be at least 1"));
        }
        if self.per_call_timeout_ms == 0 {
            return Err(AppError::config("per_call_timeout_ms must be positive"));
        }
        if self.global_timeout_ms == 0 {
            return Err(AppError::config("global_timeout_ms must be positive"));
        }
        if self.model_id.trim().is_empty() {
            return Err(AppError::config("model_id must not be empty"));
        }
        if self.extensions.is_empty() {
            return Err(AppError::config("at least one file extension is required"));
        }
        if self.rate_limit_calls > 0 && self.rate_limit_period_ms == 0 {
            return Err(AppError::config(
                "rate_limit_period_ms must be positive when rate_limit_calls is set",
            ));
        }
        if self.max_backoff_ms < self.base_backoff_ms {
            return Err(AppError::config(
                "max_backoff_ms must not be smaller than base_backoff_ms",
            ));
        }
        Ok(())
    }

    /// Provider settings with secrets read through `lookup`.
    pub fn provider_config<F>(&self, lookup: F) -> AppResult<ProviderConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let (api_key, base_url, api_version) = match self.provider {
            ProviderType::OpenAI => {
                let key = non_empty(ENV_OPENAI_API_KEY).ok_or_else(|| {
                    AppError::config(format!(
                        "{} is required when using the openai provider",
                        ENV_OPENAI_API_KEY
                    ))
                })?;
                (key, self.base_url.clone(), None)
            }
            ProviderType::Azure => {
                let key = non_empty(ENV_AZURE_API_KEY).ok_or_else(|| {
                    AppError::config(format!(
                        "{} is required when using the azure provider",
                        ENV_AZURE_API_KEY
                    ))
                })?;
                // The provider may have been switched by a later layer than
                // the environment, so the endpoint is resolved here.
                let endpoint = self
                    .base_url
                    .clone()
                    .or_else(|| non_empty(ENV_AZURE_ENDPOINT))
                    .ok_or_else(|| {
                        AppError::config(format!(
                            "{} (or base_url) is required when using the azure provider",
                            ENV_AZURE_ENDPOINT
                        ))
                    })?;
                (key, Some(endpoint), non_empty(ENV_AZURE_API_VERSION))
            }
        };

        Ok(ProviderConfig {
            provider: self.provider,
            api_key: Some(api_key),
            base_url,
            model: self.model_id.clone(),
            max_tokens: self.max_output_tokens,
            temperature: self.temperature,
            api_version,
            proxy_url: self.proxy_url.clone(),
        })
    }
}
