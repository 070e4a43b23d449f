//! Embedder trait for text-to-vector conversion.
//!
//! Uses RPITIT (native async fn in traits, Rust 2024 edition).
//! Implementations live in implicada-infra.

use implicada_types::llm::LlmError;

/// Trait for converting text into an embedding vector.
///
/// The contract fails closed: an empty result or a vector of unexpected
/// dimensionality is an error, never silently returned.
pub trait Embedder: Send + Sync {
    /// Embed a single text into a vector of `dimension()` floats.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// The model name used for embeddings (e.g., "text-embedding-004").
    fn model_name(&self) -> &str;

    /// The fixed dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
