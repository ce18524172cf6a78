//! HTTP Client Factory
//!
//! Builds the reqwest client shared by the providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult};

/// Connection establishment limit. Whole-request timeouts are enforced by
/// the caller so that retries and permits stay in one place.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Build a `reqwest::Client` with the configured proxy.
///
/// - `Some(url)` -> route every request through that proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy_url: Option<&str>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
    match proxy_url {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url).map_err(|e| LlmError::InvalidRequest {
                message: format!("invalid proxy URL {}: {}", url, e),
            })?;
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder.build().map_err(|e| LlmError::Other {
        message: format!("failed to build HTTP client: {}", e),
    })
}
