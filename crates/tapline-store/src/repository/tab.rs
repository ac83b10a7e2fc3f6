//! # Tab Repository
//!
//! Database operations for tabs, with status-guarded transitions.
//!
//! ## Guarded Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  update_open   UPDATE tabs SET items=... WHERE ... AND status='open'    │
//! │  try_settle    UPDATE tabs SET status='paid' WHERE ... AND status='open'│
//! │  delete_paid   DELETE FROM tabs WHERE ... AND status='paid'             │
//! │                                                                         │
//! │  Every write carries its precondition in the WHERE clause, so two       │
//! │  terminals racing on the same tab cannot double-apply a transition:     │
//! │  the loser's statement matches zero rows.                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::repository::{keyword, parse_json, parse_keyword, to_json};
use tapline_core::{Tab, TabStatus};

#[derive(sqlx::FromRow)]
struct TabRow {
    id: String,
    name: String,
    card_last4: Option<String>,
    items: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TabRow {
    fn into_tab(self) -> StoreResult<Tab> {
        let status = parse_keyword("Tab", &self.id, &self.status)?;
        let items = parse_json("Tab", &self.id, &self.items)?;
        Ok(Tab {
            id: self.id,
            name: self.name,
            card_last4: self.card_last4,
            items,
            created_at: self.created_at,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            status,
        })
    }
}

/// Outcome of a settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This call performed the open -> paid transition.
    Settled,
    /// The tab was already paid; this call changed nothing.
    AlreadyPaid,
}

/// Repository for tab database operations.
#[derive(Debug, Clone)]
pub struct TabRepository {
    pool: SqlitePool,
}

impl TabRepository {
    /// Creates a new TabRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TabRepository { pool }
    }

    /// Inserts a new tab.
    pub async fn insert(&self, user_id: &str, tab: &Tab) -> StoreResult<()> {
        debug!(user_id = %user_id, tab_id = %tab.id, name = %tab.name, "Inserting tab");

        let items = to_json("Tab", &tab.id, &tab.items)?;

        sqlx::query(
            r#"
            INSERT INTO tabs
                (user_id, id, name, card_last4, items, subtotal_cents,
                 tax_cents, total_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(user_id)
        .bind(&tab.id)
        .bind(&tab.name)
        .bind(&tab.card_last4)
        .bind(items)
        .bind(tab.subtotal_cents)
        .bind(tab.tax_cents)
        .bind(tab.total_cents)
        .bind(keyword(&tab.status))
        .bind(tab.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a tab by id.
    pub async fn get(&self, user_id: &str, id: &str) -> StoreResult<Option<Tab>> {
        let row: Option<TabRow> = sqlx::query_as(
            r#"
            SELECT id, name, card_last4, items, subtotal_cents, tax_cents,
                   total_cents, status, created_at
            FROM tabs
            WHERE user_id = ?1 AND id = ?2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TabRow::into_tab).transpose()
    }

    /// Lists open tabs for a user, oldest first.
    pub async fn list_open(&self, user_id: &str) -> StoreResult<Vec<Tab>> {
        let rows: Vec<TabRow> = sqlx::query_as(
            r#"
            SELECT id, name, card_last4, items, subtotal_cents, tax_cents,
                   total_cents, status, created_at
            FROM tabs
            WHERE user_id = ?1 AND status = 'open'
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TabRow::into_tab).collect()
    }

    /// Writes merged items and recomputed totals back to an open tab.
    ///
    /// Guarded on `status = 'open'`: a tab settled between read and write
    /// yields `Conflict` and the merge is discarded.
    pub async fn update_open(&self, user_id: &str, tab: &Tab) -> StoreResult<()> {
        debug!(user_id = %user_id, tab_id = %tab.id, "Updating open tab");

        let items = to_json("Tab", &tab.id, &tab.items)?;

        let result = sqlx::query(
            r#"
            UPDATE tabs
            SET items = ?1, subtotal_cents = ?2, tax_cents = ?3, total_cents = ?4
            WHERE user_id = ?5 AND id = ?6 AND status = 'open'
            "#,
        )
        .bind(items)
        .bind(tab.subtotal_cents)
        .bind(tab.tax_cents)
        .bind(tab.total_cents)
        .bind(user_id)
        .bind(&tab.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(user_id, &tab.id).await? {
                Some(_) => Err(StoreError::conflict("Tab", &tab.id)),
                None => Err(StoreError::not_found("Tab", &tab.id)),
            };
        }

        Ok(())
    }

    /// Attempts the open -> paid transition.
    ///
    /// Exactly one concurrent caller observes `Settled`; any other sees
    /// `AlreadyPaid`. Settlement side effects (depletion, sale records) must
    /// only run on `Settled`.
    pub async fn try_settle(&self, user_id: &str, id: &str) -> StoreResult<SettleOutcome> {
        let result = sqlx::query(
            r#"
            UPDATE tabs
            SET status = 'paid'
            WHERE user_id = ?1 AND id = ?2 AND status = 'open'
            "#,
        )
        .bind(user_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            debug!(user_id = %user_id, tab_id = %id, "Tab settled");
            return Ok(SettleOutcome::Settled);
        }

        match self.get(user_id, id).await? {
            Some(tab) if tab.status == TabStatus::Paid => Ok(SettleOutcome::AlreadyPaid),
            Some(_) => Err(StoreError::conflict("Tab", id)),
            None => Err(StoreError::not_found("Tab", id)),
        }
    }

    /// Removes a settled tab from the open set.
    ///
    /// Guarded on `status = 'paid'`: an open tab cannot be deleted, it must
    /// go through settlement first.
    pub async fn delete_paid(&self, user_id: &str, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM tabs
            WHERE user_id = ?1 AND id = ?2 AND status = 'paid'
            "#,
        )
        .bind(user_id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get(user_id, id).await? {
                Some(_) => Err(StoreError::conflict("Tab", id)),
                None => Err(StoreError::not_found("Tab", id)),
            };
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
    use tapline_core::{Cart, Category, Product, TaxConfig};

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category: Category::Beer,
            price_cents: 700,
            quantity: 24,
            unit_label: "bottles".to_string(),
            bottle_volume_ml: Some(341.0),
            origin: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tab(name: &str) -> Tab {
        let mut cart = Cart::new();
        cart.add_product(&product("beer-1"), 2).unwrap();
        Tab::open(name, Some("4111 1111 1111 1234"), cart.items, &TaxConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_round_trip() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().tabs();
        let t = tab("Table 4");
        repo.insert("u1", &t).await.unwrap();

        let loaded = repo.get("u1", &t.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Table 4");
        assert_eq!(loaded.card_last4.as_deref(), Some("1234"));
        assert_eq!(loaded.status, TabStatus::Open);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.total_cents, t.total_cents);
    }

    #[tokio::test]
    async fn test_settle_exactly_once() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().tabs();
        let t = tab("Dana");
        repo.insert("u1", &t).await.unwrap();

        assert_eq!(
            repo.try_settle("u1", &t.id).await.unwrap(),
            SettleOutcome::Settled
        );
        assert_eq!(
            repo.try_settle("u1", &t.id).await.unwrap(),
            SettleOutcome::AlreadyPaid
        );

        assert!(matches!(
            repo.try_settle("u1", "missing").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_rejected_after_settlement() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().tabs();
        let t = tab("Dana");
        repo.insert("u1", &t).await.unwrap();
        repo.try_settle("u1", &t.id).await.unwrap();

        let err = repo.update_open("u1", &t).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_open_tab_cannot_be_deleted() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().tabs();
        let t = tab("Dana");
        repo.insert("u1", &t).await.unwrap();

        let err = repo.delete_paid("u1", &t.id).await.unwrap_err();
        assert!(err.is_conflict());

        repo.try_settle("u1", &t.id).await.unwrap();
        repo.delete_paid("u1", &t.id).await.unwrap();
        assert!(repo.get("u1", &t.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_open_excludes_paid() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().tabs();
        let a = tab("A");
        let b = tab("B");
        repo.insert("u1", &a).await.unwrap();
        repo.insert("u1", &b).await.unwrap();
        repo.try_settle("u1", &a.id).await.unwrap();

        let open = repo.list_open("u1").await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, b.id);
    }
}
