//! # Audit Trail
//!
//! Best-effort writer for stock-affecting actions plus offline suspicion
//! heuristics over a log window.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LargeShrinkage    one manual adjustment drops ≥10 units or ≥50%        │
//! │  AdjustmentBurst   >5 manual adjustments by one actor inside an hour    │
//! │  SteepPriceDrop    price change lowers the unit price by >30%           │
//! │  UnexplainedZeroing  manual adjustment to zero with no reason given     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flags are advisory. They point a manager at an entry worth a look; they
//! block nothing.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use tapline_core::{ActorContext, InventoryAction, InventoryLog, LogSource, Product};
use tapline_store::Store;

// =============================================================================
// Writer
// =============================================================================

/// Best-effort audit writer. Every method swallows store failures after a
/// `warn!`; an audit miss never fails the action it describes.
#[derive(Clone)]
pub struct AuditTrail {
    store: Store,
}

impl AuditTrail {
    pub fn new(store: Store) -> Self {
        AuditTrail { store }
    }

    /// Appends an entry, logging and swallowing failures.
    pub async fn record(&self, user_id: &str, entry: InventoryLog) {
        if let Err(e) = self.store.audit().insert(user_id, &entry).await {
            warn!(
                product_id = %entry.product_id,
                action = ?entry.action,
                error = %e,
                "Audit write failed"
            );
        }
    }

    /// Records an operator-entered quantity change.
    pub async fn record_manual_adjustment(
        &self,
        user_id: &str,
        product: &Product,
        new_quantity: i64,
        reason: Option<String>,
        actor: &ActorContext,
    ) {
        self.record(
            user_id,
            InventoryLog {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                action: InventoryAction::ManualAdjustment,
                previous_quantity: Some(product.quantity),
                new_quantity,
                difference: Some(new_quantity - product.quantity),
                previous_price_cents: None,
                new_price_cents: None,
                reason,
                user_id: actor.user_id.clone(),
                username: actor.username.clone(),
                user_role: actor.role,
                timestamp: Utc::now(),
                source: LogSource::Inventory,
            },
        )
        .await;
    }

    /// Records stock received.
    pub async fn record_restock(
        &self,
        user_id: &str,
        product: &Product,
        new_quantity: i64,
        actor: &ActorContext,
    ) {
        self.record(
            user_id,
            InventoryLog {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                action: InventoryAction::Restock,
                previous_quantity: Some(product.quantity),
                new_quantity,
                difference: Some(new_quantity - product.quantity),
                previous_price_cents: None,
                new_price_cents: None,
                reason: None,
                user_id: actor.user_id.clone(),
                username: actor.username.clone(),
                user_role: actor.role,
                timestamp: Utc::now(),
                source: LogSource::Inventory,
            },
        )
        .await;
    }

    /// Records a unit price change.
    pub async fn record_price_change(
        &self,
        user_id: &str,
        product: &Product,
        new_price_cents: i64,
        actor: &ActorContext,
    ) {
        self.record(
            user_id,
            InventoryLog {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                action: InventoryAction::PriceChange,
                previous_quantity: None,
                new_quantity: product.quantity,
                difference: None,
                previous_price_cents: Some(product.price_cents),
                new_price_cents: Some(new_price_cents),
                reason: None,
                user_id: actor.user_id.clone(),
                username: actor.username.clone(),
                user_role: actor.role,
                timestamp: Utc::now(),
                source: LogSource::Inventory,
            },
        )
        .await;
    }
}

// =============================================================================
// Suspicion Heuristics (pure)
// =============================================================================

/// Which rule a flag comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuspicionKind {
    LargeShrinkage,
    AdjustmentBurst,
    SteepPriceDrop,
    UnexplainedZeroing,
}

/// One advisory finding over the scanned window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspicionFlag {
    pub kind: SuspicionKind,
    /// The log entry that triggered the rule.
    pub log_id: String,
    pub product_id: String,
    pub actor_id: String,
    pub description: String,
}

/// Scans a log window for entries worth a manager's attention.
///
/// Entries are expected in ascending timestamp order, as returned by the
/// audit repository's range query.
pub fn scan_for_suspicious(logs: &[InventoryLog]) -> Vec<SuspicionFlag> {
    let mut flags = Vec::new();

    for entry in logs {
        match entry.action {
            InventoryAction::ManualAdjustment => {
                flag_shrinkage(entry, &mut flags);
                flag_zeroing(entry, &mut flags);
            }
            InventoryAction::PriceChange => flag_price_drop(entry, &mut flags),
            _ => {}
        }
    }

    flag_bursts(logs, &mut flags);
    flags
}

fn flag_shrinkage(entry: &InventoryLog, flags: &mut Vec<SuspicionFlag>) {
    let Some(previous) = entry.previous_quantity else {
        return;
    };
    let drop = previous - entry.new_quantity;
    if drop <= 0 {
        return;
    }

    let large_absolute = drop >= 10;
    let large_relative = previous > 0 && drop * 2 >= previous;

    if large_absolute || large_relative {
        flags.push(SuspicionFlag {
            kind: SuspicionKind::LargeShrinkage,
            log_id: entry.id.clone(),
            product_id: entry.product_id.clone(),
            actor_id: entry.user_id.clone(),
            description: format!(
                "Manual adjustment removed {} of {} units of {}",
                drop, previous, entry.product_name
            ),
        });
    }
}

fn flag_zeroing(entry: &InventoryLog, flags: &mut Vec<SuspicionFlag>) {
    let has_reason = entry
        .reason
        .as_deref()
        .map(|r| !r.trim().is_empty())
        .unwrap_or(false);

    if entry.new_quantity == 0 && !has_reason {
        flags.push(SuspicionFlag {
            kind: SuspicionKind::UnexplainedZeroing,
            log_id: entry.id.clone(),
            product_id: entry.product_id.clone(),
            actor_id: entry.user_id.clone(),
            description: format!("{} zeroed without a reason", entry.product_name),
        });
    }
}

fn flag_price_drop(entry: &InventoryLog, flags: &mut Vec<SuspicionFlag>) {
    let (Some(previous), Some(new)) = (entry.previous_price_cents, entry.new_price_cents) else {
        return;
    };
    if previous <= 0 {
        return;
    }

    // Drop of more than 30%: new < 70% of previous, in integer math.
    if new * 10 < previous * 7 {
        flags.push(SuspicionFlag {
            kind: SuspicionKind::SteepPriceDrop,
            log_id: entry.id.clone(),
            product_id: entry.product_id.clone(),
            actor_id: entry.user_id.clone(),
            description: format!(
                "Price of {} dropped from {} to {} cents",
                entry.product_name, previous, new
            ),
        });
    }
}

fn flag_bursts(logs: &[InventoryLog], flags: &mut Vec<SuspicionFlag>) {
    let manual: Vec<&InventoryLog> = logs
        .iter()
        .filter(|e| e.action == InventoryAction::ManualAdjustment)
        .collect();

    // Sliding one-hour window per actor over timestamp-ordered entries.
    // The flag lands on the entry that tips the count past five.
    let window = Duration::hours(1);
    for (i, entry) in manual.iter().enumerate() {
        let in_window = manual[..=i]
            .iter()
            .filter(|e| e.user_id == entry.user_id && entry.timestamp - e.timestamp <= window)
            .count();

        if in_window == 6 {
            flags.push(SuspicionFlag {
                kind: SuspicionKind::AdjustmentBurst,
                log_id: entry.id.clone(),
                product_id: entry.product_id.clone(),
                actor_id: entry.user_id.clone(),
                description: format!(
                    "{} made more than 5 manual adjustments within an hour",
                    entry.username
                ),
            });
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
