use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed in JSON
    #[serde(with = "time::serde::rfc3339::option")]
    pub email_verified_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

/// Bearer token record. Only the SHA-256 digest of the secret is kept.
#[derive(Debug, Clone, FromRow)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub revoked: bool,
    pub created_at: OffsetDateTime,
    pub expires_at: Option<OffsetDateTime>,
}

impl AccessToken {
    pub fn is_usable_at(&self, now: OffsetDateTime) -> bool {
        !self.revoked && self.expires_at.map_or(true, |exp| exp > now)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewAccessToken<'a> {
    pub id: Uuid,
    pub user_id: i64,
    pub name: &'a str,
    pub token_hash: &'a str,
    pub expires_at: Option<OffsetDateTime>,
}
