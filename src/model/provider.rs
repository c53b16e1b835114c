//! The model-client trait boundary.
//!
//! Grounded on `agenticlaw-llm::provider::LlmProvider`: same error enum
//! shape, same async-trait-over-`Arc` pattern so the orchestrator can hold
//! one `Arc<dyn ModelClient>` and swap providers without touching the
//! orchestration logic.

use super::types::{ModelCompletion, ModelRequest};
use async_trait::async_trait;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    fn name(&self) -> &str;

    /// Free-form, tool-enabled chat completion.
    async fn complete(&self, request: ModelRequest) -> ModelResult<ModelCompletion>;

    /// Strict-JSON completion for planning calls: the returned text is
    /// guaranteed (or re-prompted for, by the concrete client) to parse
    /// as `serde_json::Value`.
    async fn complete_json(&self, request: ModelRequest) -> ModelResult<serde_json::Value> {
        let completion = self.complete(request).await?;
        serde_json::from_str(completion.text.trim())
            .map_err(|e| ModelError::InvalidResponse(format!("not valid JSON: {e}")))
    }
}
