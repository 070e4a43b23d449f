//! GenerationProvider trait definition.
//!
//! The generation service is opaque to the core: an ordered list of
//! role-tagged messages goes in, raw text comes out. Model selection is a
//! parameter so the narrower follow-up call can use a different model than
//! the primary call.
//!
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).
//! Implementations live in implicada-infra (e.g., `GeminiGenerator`).

use implicada_types::llm::{LlmError, PromptMessage};

/// Trait for generative-model backends.
pub trait GenerationProvider: Send + Sync {
    /// Human-readable provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send an ordered message sequence and receive the raw response text.
    fn generate(
        &self,
        model: &str,
        messages: &[PromptMessage],
    ) -> impl std::future::Future<Output = Result<String, LlmError>> + Send;
}
