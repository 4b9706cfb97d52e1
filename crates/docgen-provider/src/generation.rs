//! Content generation and embedding seams.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::operation::OperationHandle;

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// A JSON document.
    Json,
}

/// One generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Full prompt.
    pub prompt: String,
    /// Requested response shape.
    pub format: ResponseFormat,
}

impl GenerationRequest {
    /// A free-text request.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Text,
        }
    }

    /// A JSON request.
    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            format: ResponseFormat::Json,
        }
    }
}

/// What a generation call returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    /// The provider answered synchronously.
    Text(String),
    /// The provider started a long-running operation.
    Pending(OperationHandle),
}

/// Content generation provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Start or run a generation.
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError>;
}

/// Text embedding provider.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Embed `text` into a vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
