//! In-memory repositories backing the unit and router tests.

use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{RepoError, TokenRepo, UserRepo},
        repo_types::{AccessToken, NewAccessToken, NewUser, User},
    },
    products::{
        repo::ProductRepo,
        repo_types::{NewProduct, Product, ProductChanges},
    },
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tokens: Vec<AccessToken>,
    products: BTreeMap<i64, Product>,
    last_user_id: i64,
    last_product_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> anyhow::Result<T> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))?;
        Ok(f(&mut tables))
    }

    pub fn user_count(&self) -> usize {
        self.with(|t| t.users.len()).unwrap_or_default()
    }

    pub fn token_count(&self) -> usize {
        self.with(|t| t.tokens.len()).unwrap_or_default()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create(&self, new: NewUser<'_>) -> Result<User, RepoError> {
        self.with(|t| {
            if t.users.values().any(|u| u.email == new.email) {
                return Err(RepoError::DuplicateEmail);
            }
            t.last_user_id += 1;
            let now = OffsetDateTime::now_utc();
            let user = User {
                id: t.last_user_id,
                name: new.name.to_string(),
                email: new.email.to_string(),
                password_hash: new.password_hash.to_string(),
                email_verified_at: None,
                created_at: now,
                updated_at: now,
            };
            t.users.insert(user.id, user.clone());
            Ok(user)
        })?
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        self.with(|t| t.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        self.with(|t| t.users.get(&id).cloned())
    }
}

#[async_trait]
impl TokenRepo for MemoryStore {
    async fn insert(&self, new: NewAccessToken<'_>) -> anyhow::Result<AccessToken> {
        self.with(|t| {
            let token = AccessToken {
                id: new.id,
                user_id: new.user_id,
                name: new.name.to_string(),
                token_hash: new.token_hash.to_string(),
                revoked: false,
                created_at: OffsetDateTime::now_utc(),
                expires_at: new.expires_at,
            };
            t.tokens.push(token.clone());
            token
        })
    }

    async fn find_by_hash(&self, token_hash: &str) -> anyhow::Result<Option<AccessToken>> {
        self.with(|t| t.tokens.iter().find(|tok| tok.token_hash == token_hash).cloned())
    }

    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        self.with(|t| match t.tokens.iter_mut().find(|tok| tok.id == id) {
            Some(tok) if !tok.revoked => {
                tok.revoked = true;
                true
            }
            _ => false,
        })
    }
}

#[async_trait]
impl ProductRepo for MemoryStore {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        self.with(|t| t.products.values().cloned().collect())
    }

    async fn add(&self, new: NewProduct) -> anyhow::Result<Product> {
        self.with(|t| {
            t.last_product_id += 1;
            let now = OffsetDateTime::now_utc();
            let product = Product {
                id: t.last_product_id,
                name: new.name,
                description: new.description,
                price: new.price,
                created_at: now,
                updated_at: now,
            };
            t.products.insert(product.id, product.clone());
            product
        })
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>> {
        self.with(|t| t.products.get(&id).cloned())
    }

    async fn update(&self, id: i64, changes: ProductChanges) -> anyhow::Result<Option<Product>> {
        self.with(|t| {
            let product = t.products.get_mut(&id)?;
            if let Some(name) = changes.name {
                product.name = name;
            }
            if let Some(description) = changes.description {
                product.description = description;
            }
            if let Some(price) = changes.price {
                product.price = price;
            }
            product.updated_at = OffsetDateTime::now_utc();
            Some(product.clone())
        })
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        self.with(|t| t.products.remove(&id).is_some())
    }
}
