//! # Sale Repository
//!
//! Append-only sale records. Rows are inserted once at checkout and only
//! ever read back for reporting; there is no update path.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use crate::repository::{parse_json, to_json};
use tapline_core::{Sale, TaxBreakdown};

#[derive(sqlx::FromRow)]
struct SaleRow {
    id: String,
    lines: String,
    subtotal_cents: i64,
    tax_cents: i64,
    tax_breakdown: Option<String>,
    tip_cents: i64,
    total_cents: i64,
    payment_method: String,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self) -> StoreResult<Sale> {
        let lines = parse_json("Sale", &self.id, &self.lines)?;
        let tax_breakdown: Option<TaxBreakdown> = match &self.tax_breakdown {
            Some(raw) => Some(parse_json("Sale", &self.id, raw)?),
            None => None,
        };
        Ok(Sale {
            id: self.id,
            lines,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            tax_breakdown,
            tip_cents: self.tip_cents,
            total_cents: self.total_cents,
            payment_method: self.payment_method,
            created_at: self.created_at,
        })
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a completed sale.
    pub async fn insert(&self, user_id: &str, sale: &Sale) -> StoreResult<()> {
        debug!(
            user_id = %user_id,
            sale_id = %sale.id,
            total_cents = sale.total_cents,
            "Inserting sale"
        );

        let lines = to_json("Sale", &sale.id, &sale.lines)?;
        let tax_breakdown = match &sale.tax_breakdown {
            Some(b) => Some(to_json("Sale", &sale.id, b)?),
            None => None,
        };

        sqlx::query(
            r#"
            INSERT INTO sales
                (user_id, id, lines, subtotal_cents, tax_cents, tax_breakdown,
                 tip_cents, total_cents, payment_method, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(user_id)
        .bind(&sale.id)
        .bind(lines)
        .bind(sale.subtotal_cents)
        .bind(sale.tax_cents)
        .bind(tax_breakdown)
        .bind(sale.tip_cents)
        .bind(sale.total_cents)
        .bind(&sale.payment_method)
        .bind(sale.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a sale by id.
    pub async fn get(&self, user_id: &str, id: &str) -> StoreResult<Option<Sale>> {
        let row: Option<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, lines, subtotal_cents, tax_cents, tax_breakdown,
                   tip_cents, total_cents, payment_method, created_at
            FROM sales
            WHERE user_id = ?1 AND id = ?2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(SaleRow::into_sale).transpose()
    }

    /// Lists all sales for a user, oldest first.
    pub async fn list(&self, user_id: &str) -> StoreResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, lines, subtotal_cents, tax_cents, tax_breakdown,
                   tip_cents, total_cents, payment_method, created_at
            FROM sales
            WHERE user_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SaleRow::into_sale).collect()
    }

    /// Lists sales within a half-open time range `[from, to)`, oldest first.
    pub async fn list_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Sale>> {
        let rows: Vec<SaleRow> = sqlx::query_as(
            r#"
            SELECT id, lines, subtotal_cents, tax_cents, tax_breakdown,
                   tip_cents, total_cents, payment_method, created_at
            FROM sales
            WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(SaleRow::into_sale).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use chrono::{Duration, TimeZone};
    use tapline_core::tax::{self, TaxConfig};
    use tapline_core::{MenuCategory, Money, SaleLine};

    fn sale(id: &str, created_at: DateTime<Utc>) -> Sale {
        let breakdown = tax::compute(Money::from_cents(1400), &TaxConfig::default());
        Sale {
            id: id.to_string(),
            lines: vec![SaleLine {
                item_id: "beer-1".to_string(),
                name: "Lager".to_string(),
                category: MenuCategory::Beer,
                quantity: 2,
                unit_price_cents: 700,
                is_recipe: false,
            }],
            subtotal_cents: 1400,
            tax_cents: breakdown.total_cents,
            tax_breakdown: Some(breakdown.clone()),
            tip_cents: 0,
            total_cents: 1400 + breakdown.total_cents,
            payment_method: "cash".to_string(),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_insert_and_round_trip() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().sales();
        let s = sale("s1", Utc::now());
        repo.insert("u1", &s).await.unwrap();

        let loaded = repo.get("u1", "s1").await.unwrap().unwrap();
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.lines[0].quantity, 2);
        assert_eq!(loaded.tax_breakdown.unwrap().primary_name, "GST");
        assert_eq!(loaded.total_cents, s.total_cents);
    }

    #[tokio::test]
    async fn test_missing_breakdown_round_trips_as_none() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().sales();
        let mut s = sale("s1", Utc::now());
        s.tax_breakdown = None;
        repo.insert("u1", &s).await.unwrap();

        let loaded = repo.get("u1", "s1").await.unwrap().unwrap();
        assert!(loaded.tax_breakdown.is_none());
        assert_eq!(loaded.tax_cents, s.tax_cents);
    }

    #[tokio::test]
    async fn test_list_between_half_open() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().sales();
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        repo.insert("u1", &sale("s1", base)).await.unwrap();
        repo.insert("u1", &sale("s2", base + Duration::hours(1))).await.unwrap();
        repo.insert("u1", &sale("s3", base + Duration::hours(2))).await.unwrap();

        let window = repo
            .list_between("u1", base, base + Duration::hours(2))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].id, "s1");
        assert_eq!(window[1].id, "s2");
    }
}
