//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` from implicada-core. Turns are append-only;
//! the autoincrement id is the chronological key. `list_recent` returns
//! rows newest-first exactly as queried -- callers re-sort ascending.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use implicada_core::chat::repository::TurnRepository;
use implicada_types::chat::{Turn, TurnDraft};
use implicada_types::error::RepositoryError;
use implicada_types::reply::AddressingMode;

use super::pool::DatabasePool;
use super::session::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `TurnRepository`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct TurnRow {
    id: i64,
    user_id: String,
    session_id: String,
    message: String,
    reply: String,
    addressing_mode: Option<String>,
    base_reply: Option<String>,
    followups: Option<String>,
    created_at: String,
}

impl TurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            session_id: row.try_get("session_id")?,
            message: row.try_get("message")?,
            reply: row.try_get("reply")?,
            addressing_mode: row.try_get("addressing_mode")?,
            base_reply: row.try_get("base_reply")?,
            followups: row.try_get("followups")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<Turn, RepositoryError> {
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let addressing_mode = self
            .addressing_mode
            .as_deref()
            .map(str::parse::<AddressingMode>)
            .transpose()
            .map_err(RepositoryError::Query)?;
        let followups = match self.followups.as_deref() {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| RepositoryError::Query(format!("invalid followups json: {e}")))?,
            None => Vec::new(),
        };
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Turn {
            id: self.id,
            user_id,
            session_id,
            message: self.message,
            reply: self.reply,
            addressing_mode,
            base_reply: self.base_reply,
            followups,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// TurnRepository implementation
// ---------------------------------------------------------------------------

impl TurnRepository for SqliteTurnRepository {
    async fn append(&self, draft: &TurnDraft) -> Result<Turn, RepositoryError> {
        let created_at = Utc::now();
        let followups_json = serde_json::to_string(&draft.followups)
            .map_err(|e| RepositoryError::Query(format!("followups serialize: {e}")))?;
        let embedding_json = draft
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("embedding serialize: {e}")))?;

        let result = sqlx::query(
            r#"INSERT INTO turns
               (user_id, session_id, message, reply, addressing_mode, base_reply, followups, embedding, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(draft.user_id.to_string())
        .bind(draft.session_id.to_string())
        .bind(&draft.message)
        .bind(&draft.reply)
        .bind(draft.addressing_mode.map(|m| m.to_string()))
        .bind(&draft.base_reply)
        .bind(&followups_json)
        .bind(&embedding_json)
        .bind(format_datetime(&created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Turn {
            id: result.last_insert_rowid(),
            user_id: draft.user_id,
            session_id: draft.session_id,
            message: draft.message.clone(),
            reply: draft.reply.clone(),
            addressing_mode: draft.addressing_mode,
            base_reply: draft.base_reply.clone(),
            followups: draft.followups.clone(),
            created_at,
        })
    }

    async fn append_minimal(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
        message: &str,
        reply: &str,
    ) -> Result<Turn, RepositoryError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"INSERT INTO turns (user_id, session_id, message, reply, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .bind(message)
        .bind(reply)
        .bind(format_datetime(&created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(Turn {
            id: result.last_insert_rowid(),
            user_id: *user_id,
            session_id: *session_id,
            message: message.to_string(),
            reply: reply.to_string(),
            addressing_mode: None,
            base_reply: None,
            followups: Vec::new(),
            created_at,
        })
    }

    async fn list_recent(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, session_id, message, reply, addressing_mode, base_reply, followups, created_at
               FROM turns WHERE user_id = ? AND session_id = ?
               ORDER BY id DESC LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }
        Ok(turns)
    }

    async fn list_chronological(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<Vec<Turn>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, session_id, message, reply, addressing_mode, base_reply, followups, created_at
               FROM turns WHERE user_id = ? AND session_id = ?
               ORDER BY id ASC"#,
        )
        .bind(user_id.to_string())
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                TurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }
        Ok(turns)
    }

    async fn count_for_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> Result<u64, RepositoryError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM turns WHERE user_id = ? AND session_id = ?")
                .bind(user_id.to_string())
                .bind(session_id.to_string())
                .fetch_one(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count.0 as u64)
    }
}
