//! SearchIndex trait -- the opaque ranked-retrieval service.
//!
//! Vector similarity search over documents and prior turns happens in an
//! external service; the core only knows this contract. Implementations
//! live in implicada-infra (e.g., `RpcSearchIndex`).

use uuid::Uuid;

use implicada_types::retrieval::{RetrievalError, RetrievedItem};

/// Parameters for the combined documents-and-history search.
#[derive(Debug, Clone)]
pub struct SearchRequest<'a> {
    pub query_embedding: &'a [f32],
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// Maximum document matches.
    pub doc_limit: usize,
    /// Maximum prior-turn matches.
    pub history_limit: usize,
    pub min_sim_docs: f32,
    pub min_sim_history: f32,
    /// Half-life in seconds for time-decayed recency scoring of history.
    pub recency_half_life_s: u64,
}

/// A turn to be indexed for later history retrieval.
#[derive(Debug, Clone)]
pub struct TurnIndexEntry<'a> {
    pub turn_id: i64,
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// The text the embedding was computed from (`{message}\n{reply}`).
    pub content: &'a str,
    pub embedding: &'a [f32],
}

/// Trait for the ranked-retrieval service.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait SearchIndex: Send + Sync {
    /// Combined ranked retrieval over documents and prior turns, scoped
    /// to the given user and session.
    fn search_docs_and_history(
        &self,
        request: SearchRequest<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<RetrievedItem>, RetrievalError>> + Send;

    /// Document-only similarity search (fallback path).
    fn match_documents(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> impl std::future::Future<Output = Result<Vec<RetrievedItem>, RetrievalError>> + Send;

    /// Index a persisted turn so future searches can retrieve it.
    fn index_turn(
        &self,
        entry: TurnIndexEntry<'_>,
    ) -> impl std::future::Future<Output = Result<(), RetrievalError>> + Send;
}
