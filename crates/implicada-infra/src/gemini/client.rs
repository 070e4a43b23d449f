//! Gemini HTTP clients for generation and embedding.
//!
//! `GeminiGenerator` implements [`GenerationProvider`] over
//! `models/{model}:generateContent`; `GeminiEmbedder` implements
//! [`Embedder`] over `models/{model}:embedContent` with fail-closed
//! dimensionality checks.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and only exposed
//! when constructing request headers. Neither struct derives `Debug`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use implicada_core::llm::provider::GenerationProvider;
use implicada_core::retrieval::embedder::Embedder;
use implicada_types::llm::{LlmError, PromptMessage};

use super::types::{
    Content, EmbedContentRequest, EmbedContentResponse, GenerateContentRequest,
    GenerateContentResponse, Part,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shared HTTP plumbing for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with the default base URL.
    pub fn new(api_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn url(&self, model: &str, operation: &str) -> String {
        format!("{}/models/{model}:{operation}", self.base_url)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, LlmError>
    where
        B: serde::Serialize,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthenticationFailed,
                400 => LlmError::InvalidRequest(error_body),
                _ => LlmError::Provider {
                    message: format!("HTTP {status}: {error_body}"),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(format!("failed to parse response: {e}")))
    }
}

/// Gemini generation provider.
pub struct GeminiGenerator {
    client: GeminiClient,
}

impl GeminiGenerator {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Map ordered prompt messages to Gemini content blocks.
    fn to_contents(messages: &[PromptMessage]) -> Vec<Content> {
        messages
            .iter()
            .map(|m| Content {
                role: Some(m.role.to_string()),
                parts: vec![Part {
                    text: m.text.clone(),
                }],
            })
            .collect()
    }
}

impl GenerationProvider for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> Result<String, LlmError> {
        let body = GenerateContentRequest {
            contents: Self::to_contents(messages),
        };
        let url = self.client.url(model, "generateContent");

        let response: GenerateContentResponse = self.client.post(&url, &body).await?;

        let text = response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Ok(text)
    }
}

/// Gemini embedding provider with fail-closed dimensionality checks.
pub struct GeminiEmbedder {
    client: GeminiClient,
    model: String,
    dimension: usize,
}

impl GeminiEmbedder {
    pub fn new(client: GeminiClient, model: String, dimension: usize) -> Self {
        Self {
            client,
            model,
            dimension,
        }
    }
}

impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbedContentRequest {
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            output_dimensionality: Some(self.dimension),
        };
        let url = self.client.url(&self.model, "embedContent");

        let response: EmbedContentResponse = self.client.post(&url, &body).await?;

        let values = response.embedding.map(|e| e.values).unwrap_or_default();
        if values.is_empty() {
            return Err(LlmError::EmptyEmbedding);
        }
        if values.len() != self.dimension {
            return Err(LlmError::DimensionMismatch {
                expected: self.dimension,
                got: values.len(),
            });
        }
        Ok(values)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
