use std::sync::Arc;

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::{
    repo::{TokenRepo, UserRepo},
    repo_types::{AccessToken, NewAccessToken, User},
};

const SECRET_BYTES: usize = 32;
const TOKEN_NAME: &str = "authToken";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A freshly minted token. `secret` is the only copy of the bearer value.
pub struct IssuedToken {
    pub token: AccessToken,
    pub secret: String,
}

/// Mints, resolves and revokes opaque bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    tokens: Arc<dyn TokenRepo>,
    users: Arc<dyn UserRepo>,
    ttl: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(tokens: Arc<dyn TokenRepo>, users: Arc<dyn UserRepo>, ttl: Option<Duration>) -> Self {
        Self { tokens, users, ttl }
    }

    pub async fn issue(&self, user: &User) -> anyhow::Result<IssuedToken> {
        let secret = generate_secret();
        let token_hash = digest(&secret);
        let expires_at = self.ttl.map(|ttl| OffsetDateTime::now_utc() + ttl);
        let token = self
            .tokens
            .insert(NewAccessToken {
                id: Uuid::new_v4(),
                user_id: user.id,
                name: TOKEN_NAME,
                token_hash: &token_hash,
                expires_at,
            })
            .await?;
        debug!(
            user_id = user.id,
            token_id = %token.id,
            name = %token.name,
            created_at = %token.created_at,
            "token issued"
        );
        Ok(IssuedToken { token, secret })
    }

    /// Maps a presented secret to its owner. The secret is only ever used through
    /// its digest, so lookup time does not depend on how much of it is right.
    pub async fn resolve(&self, secret: &str) -> Result<(User, AccessToken), TokenError> {
        if !looks_like_secret(secret) {
            return Err(TokenError::Invalid);
        }
        let token = self
            .tokens
            .find_by_hash(&digest(secret))
            .await?
            .ok_or(TokenError::Invalid)?;
        if !token.is_usable_at(OffsetDateTime::now_utc()) {
            debug!(token_id = %token.id, revoked = token.revoked, "token no longer usable");
            return Err(TokenError::Invalid);
        }
        let user = self
            .users
            .find_by_id(token.user_id)
            .await?
            .ok_or(TokenError::Invalid)?;
        Ok((user, token))
    }

    /// Unknown and already revoked secrets are ignored.
    #[allow(dead_code)]
    pub async fn revoke(&self, secret: &str) -> anyhow::Result<()> {
        if !looks_like_secret(secret) {
            return Ok(());
        }
        if let Some(token) = self.tokens.find_by_hash(&digest(secret)).await? {
            self.revoke_id(token.id).await?;
        }
        Ok(())
    }

    /// Revokes the token row the gate already resolved. `false` when it was
    /// already revoked or is gone.
    pub async fn revoke_id(&self, id: Uuid) -> anyhow::Result<bool> {
        let changed = self.tokens.revoke(id).await?;
        debug!(token_id = %id, changed, "token revoked");
        Ok(changed)
    }
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn digest(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

fn looks_like_secret(secret: &str) -> bool {
    secret.len() == SECRET_BYTES * 2 && secret.bytes().all(|b| b.is_ascii_hexdigit())
}
