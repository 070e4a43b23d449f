//! SQLite user and auth-token storage.
//!
//! Credential verification itself is delegated to argon2 at the API layer;
//! this repository only stores users and sha256-hashed bearer tokens.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use implicada_types::error::RepositoryError;
use implicada_types::user::User;

use super::pool::DatabasePool;
use super::session::{format_datetime, parse_datetime};

/// SQLite-backed storage for users and auth tokens.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: Option<String>,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        Ok(User {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert a new user. Fails with `Conflict` when the email is taken.
    pub async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(user.clone()),
            Err(e) if e.to_string().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "email '{}' already registered",
                    user.email
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    /// Find a user by email (exact match).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    /// Find a user by id.
    pub async fn find_by_id(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    /// Store the sha256 hash of a newly issued bearer token.
    pub async fn insert_token(
        &self,
        user_id: &Uuid,
        token_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO auth_tokens (id, user_id, token_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(user_id.to_string())
        .bind(token_hash)
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    /// Resolve a token hash to its user and update last_used_at
    /// (best effort).
    pub async fn find_user_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            r#"SELECT u.*, t.id AS token_id FROM users u
               JOIN auth_tokens t ON t.user_id = u.id
               WHERE t.token_hash = ?"#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let token_id: String = row
            .try_get("token_id")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let _ = sqlx::query("UPDATE auth_tokens SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&token_id)
            .execute(&self.pool.writer)
            .await;

        let user_row =
            UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(Some(user_row.into_user()?))
    }
}
