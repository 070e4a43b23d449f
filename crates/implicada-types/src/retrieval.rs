//! Retrieved context items and retrieval errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source of a retrieved context item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievedKind {
    /// An indexed document fragment.
    Document,
    /// A prior turn from the same session.
    History,
}

impl fmt::Display for RetrievedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievedKind::Document => write!(f, "document"),
            RetrievedKind::History => write!(f, "history"),
        }
    }
}

impl FromStr for RetrievedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "document" => Ok(RetrievedKind::Document),
            "history" => Ok(RetrievedKind::History),
            other => Err(format!("invalid retrieved kind: '{other}'")),
        }
    }
}

/// One piece of retrieved text with its similarity score.
///
/// Request-scoped: exists only while a single chat turn is processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedItem {
    pub content: String,
    pub kind: RetrievedKind,
    /// Similarity score, recency-weighted for history items where the
    /// retrieval service supports it.
    pub similarity: f32,
}

/// Errors from the ranked-retrieval service.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("retrieval service unavailable: {0}")]
    Unavailable(String),

    #[error("retrieval protocol error: {0}")]
    Protocol(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieved_kind_roundtrip() {
        for kind in [RetrievedKind::Document, RetrievedKind::History] {
            let s = kind.to_string();
            let parsed: RetrievedKind = s.parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_retrieved_item_serde() {
        let item = RetrievedItem {
            content: "trecho".to_string(),
            kind: RetrievedKind::History,
            similarity: 0.42,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"kind\":\"history\""));
    }
}
