//! Session and turn repository trait definitions.
//!
//! Implementations live in implicada-infra (e.g., `SqliteTurnRepository`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition). Every
//! operation is scoped to an owning user id; there is no cross-user
//! visibility.

use implicada_types::chat::{Session, SessionOverview, Turn, TurnDraft};
use implicada_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for chat session persistence.
pub trait SessionRepository: Send + Sync {
    /// Create a new session.
    fn create(
        &self,
        session: &Session,
    ) -> impl std::future::Future<Output = Result<Session, RepositoryError>> + Send;

    /// Get a session by id, only if it belongs to the given user.
    fn get_if_owned(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Session>, RepositoryError>> + Send;

    /// Rename a session owned by the given user.
    fn rename(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
        title: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// List the user's sessions, most recently active first.
    fn list_by_activity(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SessionOverview>, RepositoryError>> + Send;
}

/// Repository trait for the append-only turn history.
pub trait TurnRepository: Send + Sync {
    /// Append a turn with full metadata (the "rich" write).
    fn append(
        &self,
        draft: &TurnDraft,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Append a turn with message + reply only (the fallback write).
    fn append_minimal(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
        message: &str,
        reply: &str,
    ) -> impl std::future::Future<Output = Result<Turn, RepositoryError>> + Send;

    /// Fetch the most recent turns for a user/session, newest first
    /// exactly as queried. Callers re-sort ascending for chronological use.
    fn list_recent(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Fetch all turns for a user/session in ascending id order.
    fn list_chronological(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Turn>, RepositoryError>> + Send;

    /// Count turns persisted for a user/session.
    fn count_for_session(
        &self,
        user_id: &Uuid,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
