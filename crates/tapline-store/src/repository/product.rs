//! # Product Repository
//!
//! Database operations for bottle-level stock.
//!
//! ## Key Operations
//! - CRUD scoped by user
//! - Guarded quantity writes for concurrent depletion
//!
//! ## Guarded Quantity Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            Why decrement_stock_cas instead of UPDATE ... SET?           │
//! │                                                                         │
//! │  Two checkouts selling the same bottle can interleave:                  │
//! │                                                                         │
//! │  A: read quantity = 4                                                   │
//! │  B: read quantity = 4                                                   │
//! │  A: write quantity = 3          ← fine                                  │
//! │  B: write quantity = 3          ← WRONG, lost A's decrement             │
//! │                                                                         │
//! │  The guarded form only writes when the row still holds the value the    │
//! │  caller read:                                                           │
//! │                                                                         │
//! │  UPDATE products SET quantity = ?                                       │
//! │  WHERE user_id = ? AND id = ? AND quantity = ?expected                  │
//! │                                                                         │
//! │  Zero rows affected → Conflict → caller re-reads and retries.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::repository::{keyword, parse_keyword};
use tapline_core::Product;

/// Private row shape; converted to the domain type at the boundary.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    category: String,
    price_cents: i64,
    quantity: i64,
    unit_label: String,
    bottle_volume_ml: Option<f64>,
    origin: Option<String>,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> StoreResult<Product> {
        let category = parse_keyword("Product", &self.id, &self.category)?;
        Ok(Product {
            id: self.id,
            name: self.name,
            category,
            price_cents: self.price_cents,
            quantity: self.quantity,
            unit_label: self.unit_label,
            bottle_volume_ml: self.bottle_volume_ml,
            origin: self.origin,
            image_url: self.image_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts or replaces a product for the given user.
    pub async fn upsert(&self, user_id: &str, product: &Product) -> StoreResult<()> {
        debug!(user_id = %user_id, product_id = %product.id, "Upserting product");

        sqlx::query(
            r#"
            INSERT INTO products
                (user_id, id, name, category, price_cents, quantity, unit_label,
                 bottle_volume_ml, origin, image_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ON CONFLICT (user_id, id) DO UPDATE SET
                name = excluded.name,
                category = excluded.category,
                price_cents = excluded.price_cents,
                quantity = excluded.quantity,
                unit_label = excluded.unit_label,
                bottle_volume_ml = excluded.bottle_volume_ml,
                origin = excluded.origin,
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&product.id)
        .bind(&product.name)
        .bind(keyword(&product.category))
        .bind(product.price_cents)
        .bind(product.quantity)
        .bind(&product.unit_label)
        .bind(product.bottle_volume_ml)
        .bind(&product.origin)
        .bind(&product.image_url)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by id.
    pub async fn get(&self, user_id: &str, id: &str) -> StoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, category, price_cents, quantity, unit_label,
                   bottle_volume_ml, origin, image_url, created_at, updated_at
            FROM products
            WHERE user_id = ?1 AND id = ?2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ProductRow::into_product).transpose()
    }

    /// Lists all products for a user, ordered by name.
    pub async fn list(&self, user_id: &str) -> StoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r#"
            SELECT id, name, category, price_cents, quantity, unit_label,
                   bottle_volume_ml, origin, image_url, created_at, updated_at
            FROM products
            WHERE user_id = ?1
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ProductRow::into_product).collect()
    }

    /// Compare-and-set quantity write.
    ///
    /// Succeeds only if the stored quantity still equals `expected`;
    /// otherwise returns `Conflict` and writes nothing. Callers re-read and
    /// retry with fresh values.
    pub async fn decrement_stock_cas(
        &self,
        user_id: &str,
        id: &str,
        expected: i64,
        new_quantity: i64,
    ) -> StoreResult<()> {
        debug!(
            user_id = %user_id,
            product_id = %id,
            expected = expected,
            new_quantity = new_quantity,
            "Guarded stock write"
        );

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = ?1, updated_at = ?2
            WHERE user_id = ?3 AND id = ?4 AND quantity = ?5
            "#,
        )
        .bind(new_quantity)
        .bind(Utc::now())
        .bind(user_id)
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::conflict("Product", id));
        }

        Ok(())
    }

    /// Unconditional quantity write, for operator-entered adjustments where
    /// the entered value wins regardless of concurrent sales.
    pub async fn set_quantity(&self, user_id: &str, id: &str, quantity: i64) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = ?1, updated_at = ?2
            WHERE user_id = ?3 AND id = ?4
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(user_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Updates the unit price.
    pub async fn set_price(&self, user_id: &str, id: &str, price_cents: i64) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_cents = ?1, updated_at = ?2
            WHERE user_id = ?3 AND id = ?4
            "#,
        )
        .bind(price_cents)
        .bind(Utc::now())
        .bind(user_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }

    /// Deletes a product.
    pub async fn delete(&self, user_id: &str, id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE user_id = ?1 AND id = ?2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use tapline_core::Category;

    async fn store() -> Store {
        Store::new(StoreConfig::in_memory()).await.unwrap()
    }

    fn product(id: &str, quantity: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category: Category::Wine,
            price_cents: 2100,
            quantity,
            unit_label: "bottles".to_string(),
            bottle_volume_ml: Some(750.0),
            origin: Some("Niagara, ON".to_string()),
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_round_trip() {
        let repo = store().await.products();
        repo.upsert("u1", &product("p1", 4)).await.unwrap();

        let loaded = repo.get("u1", "p1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Product p1");
        assert_eq!(loaded.category, Category::Wine);
        assert_eq!(loaded.quantity, 4);
        assert_eq!(loaded.bottle_volume_ml, Some(750.0));
    }

    #[tokio::test]
    async fn test_user_scoping() {
        let repo = store().await.products();
        repo.upsert("u1", &product("p1", 4)).await.unwrap();

        assert!(repo.get("u2", "p1").await.unwrap().is_none());
        assert!(repo.list("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cas_succeeds_on_expected_value() {
        let repo = store().await.products();
        repo.upsert("u1", &product("p1", 4)).await.unwrap();

        repo.decrement_stock_cas("u1", "p1", 4, 3).await.unwrap();
        assert_eq!(repo.get("u1", "p1").await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_cas_conflicts_on_stale_value() {
        let repo = store().await.products();
        repo.upsert("u1", &product("p1", 4)).await.unwrap();

        // Another writer got there first.
        repo.decrement_stock_cas("u1", "p1", 4, 3).await.unwrap();

        let err = repo.decrement_stock_cas("u1", "p1", 4, 3).await.unwrap_err();
        assert!(err.is_conflict());
        // Quantity untouched by the failed write.
        assert_eq!(repo.get("u1", "p1").await.unwrap().unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_set_quantity_unconditional() {
        let repo = store().await.products();
        repo.upsert("u1", &product("p1", 4)).await.unwrap();

        repo.set_quantity("u1", "p1", 24).await.unwrap();
        assert_eq!(repo.get("u1", "p1").await.unwrap().unwrap().quantity, 24);

        assert!(matches!(
            repo.set_quantity("u1", "missing", 1).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
