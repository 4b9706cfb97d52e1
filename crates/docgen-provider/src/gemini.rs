//! Gemini REST client.
//!
//! Implements generation, embedding and operation retrieval against the
//! Generative Language API (`v1beta`).

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use docgen_core::config::ProviderConfig;

use crate::client::{OperationClient, OperationRef};
use crate::error::ProviderError;
use crate::generation::{
    EmbeddingProvider, Generation, GenerationProvider, GenerationRequest, ResponseFormat,
};
use crate::operation::{OperationHandle, OperationSnapshot};

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY: usize = 2048;

/// HTTP client for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    generation_model: String,
    embedding_model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Build a client from provider configuration.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            generation_model: config.generation_model.clone(),
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Point the client at another base URL (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    fn operation_url(&self, operation: OperationRef<'_>) -> String {
        match operation {
            OperationRef::Handle(handle) => format!("{}/{}", self.base_url, handle.name()),
            OperationRef::Id(id) => format!("{}/operations/{}", self.base_url, id),
        }
    }

    fn ensure_key(&self) -> Result<(), ProviderError> {
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "provider api key is not configured".into(),
            ));
        }
        Ok(())
    }

    /// Turn a non-success response into an error.
    async fn check(response: Response, what: &str) -> Result<Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(what.to_string()));
        }
        error!(status = %status, what, "Gemini API error: {}", body);
        Err(ProviderError::Status {
            code: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}

/// Extract the text of a `generateContent` response, or the operation it
/// started.
fn interpret_generation(body: serde_json::Value) -> Result<Generation, ProviderError> {
    if let Some(name) = body.get("name").and_then(|n| n.as_str())
        && body.get("candidates").is_none()
    {
        return Ok(Generation::Pending(OperationHandle::new(name)));
    }

    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| ProviderError::InvalidResponse("no candidates in response".into()))?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        return Err(ProviderError::InvalidResponse("empty candidate text".into()));
    }
    Ok(Generation::Text(text))
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        self.ensure_key()?;
        let url = self.model_url(&self.generation_model, "generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                response_mime_type: match request.format {
                    ResponseFormat::Json => Some("application/json"),
                    ResponseFormat::Text => None,
                },
            },
        };

        debug!(model = %self.generation_model, "Sending generation request");
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, &self.generation_model).await?;
        let body: serde_json::Value = response.json().await?;
        interpret_generation(body)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.ensure_key()?;
        let url = self.model_url(&self.embedding_model, "embedContent");
        let body = EmbedContentRequest {
            model: format!("models/{}", self.embedding_model),
            content: EmbedContent {
                parts: vec![Part { text }],
            },
        };
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, &self.embedding_model).await?;
        let parsed: EmbedContentResponse = response.json().await?;
        if parsed.embedding.values.is_empty() {
            return Err(ProviderError::InvalidResponse("empty embedding".into()));
        }
        Ok(parsed.embedding.values)
    }
}

#[async_trait]
impl OperationClient for GeminiClient {
    async fn get_operation(
        &self,
        operation: OperationRef<'_>,
    ) -> Result<OperationSnapshot, ProviderError> {
        self.ensure_key()?;
        let url = self.operation_url(operation);
        let what = match operation {
            OperationRef::Handle(handle) => handle.name().to_string(),
            OperationRef::Id(id) => id.to_string(),
        };
        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let response = Self::check(response, &what).await?;
        let mut snapshot: OperationSnapshot = response.json().await?;
        if snapshot.name.is_empty() {
            snapshot.name = what;
        }
        Ok(snapshot)
    }
}
