//! HTTP client for the ranked-retrieval RPC service.
//!
//! The vector store lives behind a remote RPC surface (pgvector-backed).
//! This client implements the [`SearchIndex`] trait over three endpoints:
//! `rpc/search_docs_and_history`, `rpc/match_documents`, `rpc/index_turn`.
//! Rows with an unknown kind tag are dropped with a warning rather than
//! failing the whole result set.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use implicada_core::retrieval::index::{SearchIndex, SearchRequest, TurnIndexEntry};
use implicada_types::retrieval::{RetrievalError, RetrievedItem, RetrievedKind};

/// Remote ranked-retrieval service client.
pub struct RpcSearchIndex {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

#[derive(Debug, Serialize)]
struct CombinedSearchBody<'a> {
    query_embedding: &'a [f32],
    user_id: Uuid,
    session_id: Uuid,
    doc_limit: usize,
    history_limit: usize,
    min_sim_docs: f32,
    min_sim_history: f32,
    recency_half_life_s: u64,
}

#[derive(Debug, Serialize)]
struct MatchDocumentsBody<'a> {
    query_embedding: &'a [f32],
    limit: usize,
    min_similarity: f32,
}

#[derive(Debug, Serialize)]
struct IndexTurnBody<'a> {
    turn_id: i64,
    user_id: Uuid,
    session_id: Uuid,
    content: &'a str,
    embedding: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct SearchRow {
    content: String,
    kind: String,
    #[serde(default)]
    similarity: f32,
}

#[derive(Debug, Deserialize)]
struct DocumentRow {
    content: String,
    #[serde(default)]
    similarity: f32,
}

impl RpcSearchIndex {
    pub fn new(base_url: String, service_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    async fn call<B, R>(&self, rpc: &str, body: &B) -> Result<R, RetrievalError>
    where
        B: Serialize,
        R: serde::de::DeserializeOwned,
    {
        let url = format!("{}/rpc/{rpc}", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(self.service_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RetrievalError::Unavailable(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| RetrievalError::Protocol(e.to_string()))
    }
}

fn into_items(rows: Vec<SearchRow>) -> Vec<RetrievedItem> {
    rows.into_iter()
        .filter_map(|row| match row.kind.parse::<RetrievedKind>() {
            Ok(kind) => Some(RetrievedItem {
                content: row.content,
                kind,
                similarity: row.similarity,
            }),
            Err(e) => {
                warn!(error = %e, "dropping retrieval row with unknown kind");
                None
            }
        })
        .collect()
}

impl SearchIndex for RpcSearchIndex {
    async fn search_docs_and_history(
        &self,
        request: SearchRequest<'_>,
    ) -> Result<Vec<RetrievedItem>, RetrievalError> {
        let body = CombinedSearchBody {
            query_embedding: request.query_embedding,
            user_id: request.user_id,
            session_id: request.session_id,
            doc_limit: request.doc_limit,
            history_limit: request.history_limit,
            min_sim_docs: request.min_sim_docs,
            min_sim_history: request.min_sim_history,
            recency_half_life_s: request.recency_half_life_s,
        };
        let rows: Vec<SearchRow> = self.call("search_docs_and_history", &body).await?;
        Ok(into_items(rows))
    }

    async fn match_documents(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_similarity: f32,
    ) -> Result<Vec<RetrievedItem>, RetrievalError> {
        let body = MatchDocumentsBody {
            query_embedding,
            limit,
            min_similarity,
        };
        let rows: Vec<DocumentRow> = self.call("match_documents", &body).await?;
        Ok(rows
            .into_iter()
            .map(|row| RetrievedItem {
                content: row.content,
                kind: RetrievedKind::Document,
                similarity: row.similarity,
            })
            .collect())
    }

    async fn index_turn(&self, entry: TurnIndexEntry<'_>) -> Result<(), RetrievalError> {
        let body = IndexTurnBody {
            turn_id: entry.turn_id,
            user_id: entry.user_id,
            session_id: entry.session_id,
            content: entry.content,
            embedding: entry.embedding,
        };
        let _: serde_json::Value = self.call("index_turn", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let index = RpcSearchIndex::new(
            "http://localhost:8000/".to_string(),
            SecretString::from("key"),
        );
        assert_eq!(index.base_url, "http://localhost:8000");
    }

    #[test]
    fn test_into_items_parses_kinds() {
        let rows = vec![
            SearchRow {
                content: "doc".to_string(),
                kind: "document".to_string(),
                similarity: 0.8,
            },
            SearchRow {
                content: "hist".to_string(),
                kind: "history".to_string(),
                similarity: 0.6,
            },
        ];
        let items = into_items(rows);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, RetrievedKind::Document);
        assert_eq!(items[1].kind, RetrievedKind::History);
    }

    #[test]
    fn test_into_items_drops_unknown_kind() {
        let rows = vec![SearchRow {
            content: "x".to_string(),
            kind: "mystery".to_string(),
            similarity: 0.5,
        }];
        assert!(into_items(rows).is_empty());
    }

    #[test]
    fn test_combined_body_serializes_all_params() {
        let embedding = vec![0.1_f32, 0.2];
        let body = CombinedSearchBody {
            query_embedding: &embedding,
            user_id: Uuid::now_v7(),
            session_id: Uuid::now_v7(),
            doc_limit: 8,
            history_limit: 6,
            min_sim_docs: 0.30,
            min_sim_history: 0.25,
            recency_half_life_s: 86_400,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"doc_limit\":8"));
        assert!(json.contains("\"history_limit\":6"));
        assert!(json.contains("\"recency_half_life_s\":86400"));
    }
}
