//! # Audit Repository
//!
//! Append-only inventory log. There is deliberately no update or delete
//! method on this repository; a log row, once written, is permanent.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::StoreResult;
use crate::repository::{keyword, parse_keyword};
use tapline_core::InventoryLog;

#[derive(sqlx::FromRow)]
struct LogRow {
    id: String,
    product_id: String,
    product_name: String,
    action: String,
    previous_quantity: Option<i64>,
    new_quantity: i64,
    difference: Option<i64>,
    previous_price_cents: Option<i64>,
    new_price_cents: Option<i64>,
    reason: Option<String>,
    actor_id: String,
    actor_name: String,
    actor_role: String,
    source: String,
    created_at: DateTime<Utc>,
}

impl LogRow {
    fn into_log(self) -> StoreResult<InventoryLog> {
        let action = parse_keyword("InventoryLog", &self.id, &self.action)?;
        let user_role = parse_keyword("InventoryLog", &self.id, &self.actor_role)?;
        let source = parse_keyword("InventoryLog", &self.id, &self.source)?;
        Ok(InventoryLog {
            id: self.id,
            product_id: self.product_id,
            product_name: self.product_name,
            action,
            previous_quantity: self.previous_quantity,
            new_quantity: self.new_quantity,
            difference: self.difference,
            previous_price_cents: self.previous_price_cents,
            new_price_cents: self.new_price_cents,
            reason: self.reason,
            user_id: self.actor_id,
            username: self.actor_name,
            user_role,
            timestamp: self.created_at,
            source,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, product_id, product_name, action, previous_quantity,
           new_quantity, difference, previous_price_cents, new_price_cents,
           reason, actor_id, actor_name, actor_role, source, created_at
    FROM inventory_log
"#;

/// Repository for inventory audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one log entry.
    pub async fn insert(&self, user_id: &str, entry: &InventoryLog) -> StoreResult<()> {
        debug!(
            user_id = %user_id,
            product_id = %entry.product_id,
            action = %keyword(&entry.action),
            "Appending inventory log entry"
        );

        sqlx::query(
            r#"
            INSERT INTO inventory_log
                (user_id, id, product_id, product_name, action,
                 previous_quantity, new_quantity, difference,
                 previous_price_cents, new_price_cents, reason,
                 actor_id, actor_name, actor_role, source, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(user_id)
        .bind(&entry.id)
        .bind(&entry.product_id)
        .bind(&entry.product_name)
        .bind(keyword(&entry.action))
        .bind(entry.previous_quantity)
        .bind(entry.new_quantity)
        .bind(entry.difference)
        .bind(entry.previous_price_cents)
        .bind(entry.new_price_cents)
        .bind(&entry.reason)
        .bind(&entry.user_id)
        .bind(&entry.username)
        .bind(keyword(&entry.user_role))
        .bind(keyword(&entry.source))
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists entries for one product, newest first.
    pub async fn list_for_product(
        &self,
        user_id: &str,
        product_id: &str,
        limit: u32,
    ) -> StoreResult<Vec<InventoryLog>> {
        let sql = format!(
            "{} WHERE user_id = ?1 AND product_id = ?2 ORDER BY created_at DESC LIMIT ?3",
            SELECT_COLUMNS
        );
        let rows: Vec<LogRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    /// Lists entries within a half-open time range `[from, to)`, oldest
    /// first. This is the scan window for suspicion heuristics.
    pub async fn list_between(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<InventoryLog>> {
        let sql = format!(
            "{} WHERE user_id = ?1 AND created_at >= ?2 AND created_at < ?3 ORDER BY created_at",
            SELECT_COLUMNS
        );
        let rows: Vec<LogRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }

    /// Lists the most recent entries across all products, newest first.
    pub async fn list_recent(&self, user_id: &str, limit: u32) -> StoreResult<Vec<InventoryLog>> {
        let sql = format!(
            "{} WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
            SELECT_COLUMNS
        );
        let rows: Vec<LogRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(LogRow::into_log).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Store, StoreConfig};
    use chrono::Duration;
    use tapline_core::{InventoryAction, LogSource, Role};
    use uuid::Uuid;

    fn entry(product_id: &str, at: DateTime<Utc>) -> InventoryLog {
        InventoryLog {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            product_name: "Lager".to_string(),
            action: InventoryAction::SaleDepletion,
            previous_quantity: Some(4),
            new_quantity: 3,
            difference: Some(-1),
            previous_price_cents: None,
            new_price_cents: None,
            reason: None,
            user_id: "staff-1".to_string(),
            username: "dana".to_string(),
            user_role: Role::Staff,
            timestamp: at,
            source: LogSource::Checkout,
        }
    }

    #[tokio::test]
    async fn test_append_and_round_trip() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().audit();
        repo.insert("u1", &entry("p1", Utc::now())).await.unwrap();

        let logs = repo.list_for_product("u1", "p1", 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, InventoryAction::SaleDepletion);
        assert_eq!(logs[0].user_role, Role::Staff);
        assert_eq!(logs[0].source, LogSource::Checkout);
        assert_eq!(logs[0].difference, Some(-1));
    }

    #[tokio::test]
    async fn test_list_between_window() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().audit();
        let base = Utc::now();

        repo.insert("u1", &entry("p1", base)).await.unwrap();
        repo.insert("u1", &entry("p1", base + Duration::minutes(30))).await.unwrap();
        repo.insert("u1", &entry("p1", base + Duration::hours(2))).await.unwrap();

        let window = repo
            .list_between("u1", base, base + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[tokio::test]
    async fn test_recent_ordering() {
        let repo = Store::new(StoreConfig::in_memory()).await.unwrap().audit();
        let base = Utc::now();

        repo.insert("u1", &entry("p1", base)).await.unwrap();
        repo.insert("u1", &entry("p2", base + Duration::minutes(5))).await.unwrap();

        let recent = repo.list_recent("u1", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].product_id, "p2");
    }
}
