pub mod repository;
pub mod service;
pub mod shortcut;

use implicada_types::chat::Turn;

/// Re-sort turns into chronological order.
///
/// Retrieval queries fetch most-recent-first so LIMIT keeps the newest
/// rows; every chronological use re-sorts ascending by id, which is the
/// only ordering key.
pub fn sort_chronological(turns: &mut [Turn]) {
    turns.sort_by_key(|t| t.id);
}
