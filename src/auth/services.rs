use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::auth::{
    password::{hash_password, verify_dummy, verify_password},
    repo::{RepoError, UserRepo},
    repo_types::{NewUser, User},
};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<RepoError> for CredentialError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => CredentialError::DuplicateEmail,
            RepoError::Other(e) => CredentialError::Storage(e),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User identities and their password hashes.
#[derive(Clone)]
pub struct Credentials {
    users: Arc<dyn UserRepo>,
}

impl Credentials {
    pub fn new(users: Arc<dyn UserRepo>) -> Self {
        Self { users }
    }

    pub async fn email_taken(&self, email: &str) -> anyhow::Result<bool> {
        Ok(self
            .users
            .find_by_email(&normalize_email(email))
            .await?
            .is_some())
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let password_hash = hash_password(password)?;
        let email = normalize_email(email);
        let user = self
            .users
            .create(NewUser {
                name,
                email: &email,
                password_hash: &password_hash,
            })
            .await?;
        Ok(user)
    }

    /// Unknown email and wrong password are reported identically.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            verify_dummy(password);
            return Err(CredentialError::InvalidCredentials);
        };
        match verify_password(password, &user.password_hash) {
            Ok(true) => Ok(user),
            Ok(false) => Err(CredentialError::InvalidCredentials),
            Err(e) => {
                warn!(error = %e, user_id = user.id, "stored password hash unreadable");
                Err(CredentialError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn credentials() -> Credentials {
        Credentials::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn create_then_verify() {
        let creds = credentials();
        let user = creds
            .create_user("John Doe", " John@Example.com ", "password123")
            .await
            .unwrap();
        assert_eq!(user.email, "john@example.com");
        assert_ne!(user.password_hash, "password123");

        let verified = creds
            .verify_credentials("JOHN@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(verified.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let creds = credentials();
        creds
            .create_user("John", "john@example.com", "password123")
            .await
            .unwrap();
        let err = creds
            .create_user("Other John", "JOHN@example.com", "password456")
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::DuplicateEmail));
        assert!(creds.email_taken("john@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let creds = credentials();
        creds
            .create_user("John", "john@example.com", "password123")
            .await
            .unwrap();

        let wrong = creds
            .verify_credentials("john@example.com", "nope-nope")
            .await
            .unwrap_err();
        let unknown = creds
            .verify_credentials("ghost@example.com", "password123")
            .await
            .unwrap_err();
        assert!(matches!(wrong, CredentialError::InvalidCredentials));
        assert!(matches!(unknown, CredentialError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }
}
