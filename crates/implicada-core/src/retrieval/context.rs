//! Context retrieval with degraded fallback.
//!
//! Folds ranked-retrieval results into a single opaque context string for
//! the prompt assembler. Retrieval never aborts a turn: an embedding
//! failure yields empty context, a combined-search failure falls back to
//! two independent sub-fetches, and each sub-fetch failure is tolerated
//! as zero results for that source.

use tracing::warn;
use uuid::Uuid;

use implicada_types::config::EngineConfig;
use implicada_types::retrieval::RetrievedKind;

use crate::chat::repository::TurnRepository;
use crate::chat::sort_chronological;
use crate::retrieval::embedder::Embedder;
use crate::retrieval::index::{SearchIndex, SearchRequest};

/// Builds the retrieved-context string for one request.
pub struct ContextRetriever;

impl ContextRetriever {
    /// Retrieve and fold context for a query. Infallible by design: the
    /// worst case is an empty string.
    #[tracing::instrument(name = "build_context", skip_all, fields(session_id = %session_id))]
    pub async fn build_context<E, X, T>(
        embedder: &E,
        index: &X,
        turns: &T,
        config: &EngineConfig,
        query: &str,
        user_id: Uuid,
        session_id: Uuid,
    ) -> String
    where
        E: Embedder,
        X: SearchIndex,
        T: TurnRepository,
    {
        let embedding = match embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "query embedding failed; returning empty context");
                return String::new();
            }
        };

        let request = SearchRequest {
            query_embedding: &embedding,
            user_id,
            session_id,
            doc_limit: config.doc_match_count,
            history_limit: config.history_match_count,
            min_sim_docs: config.min_sim_docs,
            min_sim_history: config.min_sim_history,
            recency_half_life_s: config.recency_half_life_s,
        };

        match index.search_docs_and_history(request).await {
            Ok(items) => {
                let history: Vec<&str> = items
                    .iter()
                    .filter(|i| i.kind == RetrievedKind::History)
                    .map(|i| i.content.as_str())
                    .collect();
                let docs: Vec<&str> = items
                    .iter()
                    .filter(|i| i.kind == RetrievedKind::Document)
                    .map(|i| i.content.as_str())
                    .collect();
                history
                    .into_iter()
                    .chain(docs)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Err(e) => {
                warn!(error = %e, "combined retrieval failed; using fallback sources");
                Self::fallback_context(index, turns, config, &embedding, user_id, session_id)
                    .await
            }
        }
    }

    /// Independent document search + direct history fetch. The two
    /// sub-fetches are read-only and mutually independent, so they run
    /// concurrently; their results are folded history-then-documents.
    async fn fallback_context<X, T>(
        index: &X,
        turns: &T,
        config: &EngineConfig,
        embedding: &[f32],
        user_id: Uuid,
        session_id: Uuid,
    ) -> String
    where
        X: SearchIndex,
        T: TurnRepository,
    {
        let (docs_result, history_result) = tokio::join!(
            index.match_documents(embedding, config.doc_match_count, config.min_sim_docs),
            turns.list_recent(&user_id, &session_id, config.history_window),
        );

        let docs: Vec<String> = match docs_result {
            Ok(items) => items.into_iter().map(|i| i.content).collect(),
            Err(e) => {
                warn!(error = %e, "fallback document search failed");
                Vec::new()
            }
        };

        let history: Vec<String> = match history_result {
            Ok(mut recent) => {
                sort_chronological(&mut recent);
                recent
                    .into_iter()
                    .map(|t| format!("{}\n{}", t.message, t.reply))
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "fallback history fetch failed");
                Vec::new()
            }
        };

        history
            .into_iter()
            .chain(docs)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
