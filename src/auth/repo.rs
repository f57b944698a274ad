use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{AccessToken, NewAccessToken, NewUser, User};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with `DuplicateEmail` when the unique index on `email` rejects the row.
    async fn create(&self, new: NewUser<'_>) -> Result<User, RepoError>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
}

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn insert(&self, new: NewAccessToken<'_>) -> anyhow::Result<AccessToken>;
    async fn find_by_hash(&self, token_hash: &str) -> anyhow::Result<Option<AccessToken>>;
    /// Returns whether a live token was flipped to revoked.
    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, email_verified_at, created_at, updated_at";
const TOKEN_COLUMNS: &str = "id, user_id, name, token_hash, revoked, created_at, expires_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(&self, new: NewUser<'_>) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(new.name)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => RepoError::DuplicateEmail,
            other => RepoError::Other(anyhow::Error::new(other).context("insert user")),
        })
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }
}

#[derive(Clone)]
pub struct PgTokenRepo {
    db: PgPool,
}

impl PgTokenRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenRepo for PgTokenRepo {
    async fn insert(&self, new: NewAccessToken<'_>) -> anyhow::Result<AccessToken> {
        let token = sqlx::query_as::<_, AccessToken>(&format!(
            r#"
            INSERT INTO access_tokens (id, user_id, name, token_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TOKEN_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.user_id)
        .bind(new.name)
        .bind(new.token_hash)
        .bind(new.expires_at)
        .fetch_one(&self.db)
        .await
        .context("insert access token")?;
        Ok(token)
    }

    async fn find_by_hash(&self, token_hash: &str) -> anyhow::Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM access_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await
        .context("find access token")?;
        Ok(token)
    }

    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE access_tokens SET revoked = TRUE WHERE id = $1 AND NOT revoked")
            .bind(id)
            .execute(&self.db)
            .await
            .context("revoke access token")?;
        Ok(result.rows_affected() == 1)
    }
}
