//! SQLite session repository implementation.
//!
//! Implements `SessionRepository` from implicada-core using sqlx with
//! split read/write pools. Raw queries, private Row structs, every query
//! scoped to the owning user.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use implicada_core::chat::repository::SessionRepository;
use implicada_types::chat::{Session, SessionOverview};
use implicada_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    user_id: String,
    title: Option<String>,
    created_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_session(self) -> Result<Session, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Session {
            id,
            user_id,
            title: self.title,
            created_at,
        })
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session, RepositoryError> {
        sqlx::query(
            "INSERT INTO chat_sessions (id, user_id, title, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(&session.title)
        .bind(format_datetime(&session.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(session.clone())
    }

    async fn get_if_owned(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ? AND user_id = ?")
            .bind(session_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let session_row = SessionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn rename(
        &self,
        session_id: &Uuid,
        user_id: &Uuid,
        title: &str,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE chat_sessions SET title = ? WHERE id = ? AND user_id = ?")
                .bind(title)
                .bind(session_id.to_string())
                .bind(user_id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn list_by_activity(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<SessionOverview>, RepositoryError> {
        // RFC 3339 UTC strings compare lexicographically, so MAX works.
        let rows = sqlx::query(
            r#"SELECT s.id, s.title, s.created_at,
                      COALESCE(MAX(t.created_at), s.created_at) AS last_activity
               FROM chat_sessions s
               LEFT JOIN turns t ON t.session_id = s.id AND t.user_id = s.user_id
               WHERE s.user_id = ?
               GROUP BY s.id
               ORDER BY last_activity DESC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut overviews = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row
                .try_get("id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let title: Option<String> = row
                .try_get("title")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let created_at: String = row
                .try_get("created_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let last_activity: String = row
                .try_get("last_activity")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

            overviews.push(SessionOverview {
                id: Uuid::parse_str(&id)
                    .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?,
                title,
                created_at: parse_datetime(&created_at)?,
                last_activity: parse_datetime(&last_activity)?,
            });
        }

        Ok(overviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::user::SqliteUserRepository;
    use implicada_types::user::User;

    async fn test_pool() -> (tempfile::TempDir, DatabasePool) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, pool)
    }

    async fn test_user(pool: &DatabasePool) -> Uuid {
        let users = SqliteUserRepository::new(pool.clone());
        let user = User {
            id: Uuid::now_v7(),
            name: "Ana".to_string(),
            email: format!("{}@example.com", Uuid::now_v7()),
            password_hash: None,
            created_at: Utc::now(),
        };
        users.create(&user).await.unwrap();
        user.id
    }

    fn session(user_id: Uuid) -> Session {
        Session {
            id: Uuid::now_v7(),
            user_id,
            title: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_if_owned() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());
        let user_id = test_user(&pool).await;

        let created = repo.create(&session(user_id)).await.unwrap();
        let found = repo.get_if_owned(&created.id, &user_id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_get_if_owned_rejects_other_user() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());
        let owner = test_user(&pool).await;
        let other = test_user(&pool).await;

        let created = repo.create(&session(owner)).await.unwrap();
        let found = repo.get_if_owned(&created.id, &other).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_rename_owned_session() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());
        let user_id = test_user(&pool).await;

        let created = repo.create(&session(user_id)).await.unwrap();
        repo.rename(&created.id, &user_id, "novo título").await.unwrap();

        let found = repo.get_if_owned(&created.id, &user_id).await.unwrap().unwrap();
        assert_eq!(found.title.as_deref(), Some("novo título"));
    }

    #[tokio::test]
    async fn test_rename_unowned_session_is_not_found() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());
        let owner = test_user(&pool).await;
        let other = test_user(&pool).await;

        let created = repo.create(&session(owner)).await.unwrap();
        let err = repo.rename(&created.id, &other, "x").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_by_activity_scoped_to_user() {
        let (_dir, pool) = test_pool().await;
        let repo = SqliteSessionRepository::new(pool.clone());
        let user_a = test_user(&pool).await;
        let user_b = test_user(&pool).await;

        repo.create(&session(user_a)).await.unwrap();
        repo.create(&session(user_a)).await.unwrap();
        repo.create(&session(user_b)).await.unwrap();

        let listed = repo.list_by_activity(&user_a).await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}
