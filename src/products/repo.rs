use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::products::repo_types::{NewProduct, Product, ProductChanges};

#[async_trait]
pub trait ProductRepo: Send + Sync {
    /// All products in insertion order.
    async fn list(&self) -> anyhow::Result<Vec<Product>>;
    async fn add(&self, new: NewProduct) -> anyhow::Result<Product>;
    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>>;
    async fn update(&self, id: i64, changes: ProductChanges) -> anyhow::Result<Option<Product>>;
    /// Returns false when no row had that id.
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgProductRepo {
    db: PgPool,
}

impl PgProductRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepo for PgProductRepo {
    async fn list(&self) -> anyhow::Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM products
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await
        .context("list products")?;
        Ok(rows)
    }

    async fn add(&self, new: NewProduct) -> anyhow::Result<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, price)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(new.name)
        .bind(new.description)
        .bind(new.price)
        .fetch_one(&self.db)
        .await
        .context("insert product")?;
        Ok(product)
    }

    async fn find(&self, id: i64) -> anyhow::Result<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find product")?;
        Ok(product)
    }

    async fn update(&self, id: i64, changes: ProductChanges) -> anyhow::Result<Option<Product>> {
        let (set_description, description) = match changes.description {
            Some(d) => (true, d),
            None => (false, None),
        };
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
               SET name        = COALESCE($2, name),
                   description = CASE WHEN $3 THEN $4 ELSE description END,
                   price       = COALESCE($5, price),
                   updated_at  = now()
             WHERE id = $1
            RETURNING id, name, description, price, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(set_description)
        .bind(description)
        .bind(changes.price)
        .fetch_optional(&self.db)
        .await
        .context("update product")?;
        Ok(product)
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(result.rows_affected() > 0)
    }
}
