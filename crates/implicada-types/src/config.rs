//! Engine configuration.
//!
//! A single explicit struct passed by reference into each component at
//! construction. Loaded from `{data_dir}/config.toml` by implicada-infra;
//! every field has a serde default so a partial file is valid.

use serde::{Deserialize, Serialize};

/// Tunables for the response-shaping pipeline and its external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Model for the primary generation call.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Model for the secondary follow-up call; falls back to
    /// `generation_model` when unset.
    #[serde(default)]
    pub followup_model: Option<String>,

    /// Embedding model.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Fixed embedding dimensionality; mismatches fail closed.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Document matches requested from the combined retrieval call.
    #[serde(default = "default_doc_match_count")]
    pub doc_match_count: usize,

    /// Prior-turn matches requested from the combined retrieval call.
    #[serde(default = "default_history_match_count")]
    pub history_match_count: usize,

    /// Minimum similarity for document matches.
    #[serde(default = "default_min_sim_docs")]
    pub min_sim_docs: f32,

    /// Minimum similarity for history matches.
    #[serde(default = "default_min_sim_history")]
    pub min_sim_history: f32,

    /// Half-life in seconds for time-decayed recency scoring of history.
    #[serde(default = "default_recency_half_life_s")]
    pub recency_half_life_s: u64,

    /// Prior turns replayed into the prompt, most recent first.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Maximum follow-up questions kept on a reply.
    #[serde(default = "default_followup_limit")]
    pub followup_limit: usize,

    /// Character cap applied to each follow-up question.
    #[serde(default = "default_followup_char_cap")]
    pub followup_char_cap: usize,

    /// Character cap for the back-filled session title.
    #[serde(default = "default_title_char_cap")]
    pub title_char_cap: usize,
}

fn default_generation_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-004".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_doc_match_count() -> usize {
    8
}

fn default_history_match_count() -> usize {
    6
}

fn default_min_sim_docs() -> f32 {
    0.30
}

fn default_min_sim_history() -> f32 {
    0.25
}

fn default_recency_half_life_s() -> u64 {
    86_400
}

fn default_history_window() -> usize {
    10
}

fn default_followup_limit() -> usize {
    2
}

fn default_followup_char_cap() -> usize {
    140
}

fn default_title_char_cap() -> usize {
    60
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_model: default_generation_model(),
            followup_model: None,
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            doc_match_count: default_doc_match_count(),
            history_match_count: default_history_match_count(),
            min_sim_docs: default_min_sim_docs(),
            min_sim_history: default_min_sim_history(),
            recency_half_life_s: default_recency_half_life_s(),
            history_window: default_history_window(),
            followup_limit: default_followup_limit(),
            followup_char_cap: default_followup_char_cap(),
            title_char_cap: default_title_char_cap(),
        }
    }
}

impl EngineConfig {
    /// The model used for the secondary follow-up call.
    pub fn followup_model(&self) -> &str {
        self.followup_model
            .as_deref()
            .unwrap_or(&self.generation_model)
    }
}
