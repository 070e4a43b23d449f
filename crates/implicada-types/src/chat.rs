//! Chat session and turn types.
//!
//! A session groups turns for one user; a turn is one persisted
//! user-message/reply pair. Turns are immutable once written and their
//! integer id defines chronological order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reply::AddressingMode;

/// A chat session owned by exactly one user.
///
/// Created on the first message of a conversation or explicitly. The title
/// is back-filled from the first user message once exactly one turn exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A session row enriched with its last-activity timestamp, for
/// activity-ordered listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOverview {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// One persisted user-message/reply pair.
///
/// The id is assigned by the database (autoincrement) and is the only
/// chronological key: retrieval queries fetch most-recent-first for
/// limiting and callers re-sort ascending by id before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: i64,
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// The raw user message.
    pub message: String,
    /// The final shaped reply as returned to the user.
    pub reply: String,
    /// Addressing mode resolved for this turn (rich writes only).
    pub addressing_mode: Option<AddressingMode>,
    /// The pre-shaping reply text (rich writes only).
    pub base_reply: Option<String>,
    /// Follow-up questions attached to the reply (rich writes only).
    pub followups: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to append a turn.
///
/// A rich write carries the embedding and shaping metadata; a minimal
/// write keeps only message + reply when the rich write fails.
#[derive(Debug, Clone)]
pub struct TurnDraft {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub message: String,
    pub reply: String,
    pub addressing_mode: Option<AddressingMode>,
    pub base_reply: Option<String>,
    pub followups: Vec<String>,
    /// Embedding of `{message}\n{reply}` for later retrieval.
    pub embedding: Option<Vec<f32>>,
}
