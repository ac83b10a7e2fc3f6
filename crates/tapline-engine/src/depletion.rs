//! # Inventory Depletion Engine
//!
//! Turns a completed sale's lines into stock decrements, raises stock
//! alerts, and writes audit entries.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  sold items ──plan()──► demand per product (ml + whole units)           │
//! │                              │                                          │
//! │              per product:    ▼                                          │
//! │        ┌──► read product, units = whole + ceil(ml / per_unit_ml)        │
//! │        │         │                                                      │
//! │        │         ▼                                                      │
//! │  retry │   CAS: UPDATE quantity WHERE quantity = read value             │
//! │  (≤5)  │         │                                                      │
//! │        └── lost ─┤                                                      │
//! │                  ▼ won                                                  │
//! │          audit entry (best-effort) + threshold check ──► alert queue    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Depletion is best-effort at-least-once: the sale is already committed
//! when this runs, so per-product failures are logged and reported, never
//! raised to the operator.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use tapline_core::{
    ActorContext, CartItem, CartSource, InventoryAction, InventoryLog, LogSource, Product,
};
use tapline_store::{Store, StoreError};

use crate::alerts::{AlertKind, AlertQueue, StockAlert};
use crate::audit::AuditTrail;
use crate::error::{EngineError, EngineResult};

/// Bounded retries for the guarded stock write.
const MAX_CAS_ATTEMPTS: u32 = 5;

// =============================================================================
// Demand Planning (pure)
// =============================================================================

/// Accumulated demand against one product across all sold lines.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProductDemand {
    /// Volume drawn from the product, in millilitres.
    pub ml: f64,
    /// Whole units drawn directly (bottles sold as-is, discrete ingredients).
    pub units: i64,
}

impl ProductDemand {
    /// Whole units consumed given the product's per-unit volume. Partial
    /// bottles are conservatively consumed whole.
    pub fn units_consumed(&self, per_unit_ml: f64) -> i64 {
        let volume_units = if self.ml > 0.0 && per_unit_ml > 0.0 {
            (self.ml / per_unit_ml).ceil() as i64
        } else {
            0
        };
        self.units + volume_units
    }
}

/// Collapses sold lines into per-product demand.
///
/// Recipe lines contribute per ingredient, scaled by the sold quantity;
/// unresolved ingredients are skipped (checkout validation rejects them
/// before a sale can carry any). Direct product lines contribute whole
/// units.
pub fn depletion_plan(items: &[CartItem]) -> BTreeMap<String, ProductDemand> {
    let mut plan: BTreeMap<String, ProductDemand> = BTreeMap::new();

    for item in items {
        match &item.source {
            CartSource::Product { product_id } => {
                plan.entry(product_id.clone()).or_default().units += item.quantity;
            }
            CartSource::Recipe { ingredients, .. } => {
                for ingredient in ingredients {
                    let Some(product_id) = ingredient.product_id.as_deref() else {
                        continue;
                    };
                    let demand = plan.entry(product_id.to_string()).or_default();

                    match ingredient.unit.to_ml(ingredient.quantity) {
                        Some(ml_per_serving) => demand.ml += ml_per_serving * item.quantity as f64,
                        None => {
                            demand.units +=
                                (ingredient.quantity * item.quantity as f64).ceil() as i64
                        }
                    }
                }
            }
        }
    }

    plan
}

/// Low-stock threshold for a post-decrement quantity.
pub fn low_stock_threshold(new_quantity: i64) -> i64 {
    (new_quantity as f64 * 0.25).ceil().max(1.0) as i64
}

// =============================================================================
// Depletion Report
// =============================================================================

/// One applied decrement.
#[derive(Debug, Clone)]
pub struct AppliedDecrement {
    pub product_id: String,
    pub product_name: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
}

/// What one depletion pass did. Failures are descriptions, not errors:
/// by the time depletion runs the sale is committed.
#[derive(Debug, Clone, Default)]
pub struct DepletionReport {
    pub applied: Vec<AppliedDecrement>,
    pub failures: Vec<String>,
}

// =============================================================================
// Engine
// =============================================================================

/// Applies stock decrements for completed sales.
pub struct DepletionEngine {
    store: Store,
    audit: AuditTrail,
    alerts: Arc<AlertQueue>,
}

impl DepletionEngine {
    pub fn new(store: Store, alerts: Arc<AlertQueue>) -> Self {
        let audit = AuditTrail::new(store.clone());
        DepletionEngine {
            store,
            audit,
            alerts,
        }
    }

    /// Runs depletion for one completed sale.
    ///
    /// Products are processed sequentially; a failure on one leaves the
    /// rest untouched and is recorded in the report.
    pub async fn run(
        &self,
        user_id: &str,
        items: &[CartItem],
        actor: &ActorContext,
        source: LogSource,
    ) -> DepletionReport {
        let plan = depletion_plan(items);
        let mut report = DepletionReport::default();

        for (product_id, demand) in plan {
            match self.decrement_with_retry(user_id, &product_id, demand).await {
                Ok(Some(applied)) => {
                    self.write_audit(user_id, &applied, actor, source).await;
                    self.raise_alerts(&applied);
                    report.applied.push(applied);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        product_id = %product_id,
                        error = %e,
                        "Depletion failed for product; sale remains committed"
                    );
                    report.failures.push(format!("{}: {}", product_id, e));
                }
            }
        }

        report
    }

    /// Read-compute-CAS loop for one product.
    ///
    /// Returns `Ok(None)` when there is nothing to do (missing product or
    /// zero demand). A lost CAS re-reads and retries with fresh values, up
    /// to the attempt bound.
    async fn decrement_with_retry(
        &self,
        user_id: &str,
        product_id: &str,
        demand: ProductDemand,
    ) -> EngineResult<Option<AppliedDecrement>> {
        let products = self.store.products();

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some(product) = products.get(user_id, product_id).await? else {
                warn!(
                    user_id = %user_id,
                    product_id = %product_id,
                    "Sold item references missing product; skipping depletion"
                );
                return Ok(None);
            };

            let consumed = demand.units_consumed(product.per_unit_ml());
            if consumed <= 0 {
                return Ok(None);
            }

            // Clamp at zero: stock never goes negative, even on oversell.
            let new_quantity = (product.quantity - consumed).max(0);

            match products
                .decrement_stock_cas(user_id, product_id, product.quantity, new_quantity)
                .await
            {
                Ok(()) => {
                    debug!(
                        product_id = %product_id,
                        previous = product.quantity,
                        new = new_quantity,
                        "Stock depleted"
                    );
                    return Ok(Some(AppliedDecrement {
                        product_id: product.id,
                        product_name: product.name,
                        previous_quantity: product.quantity,
                        new_quantity,
                    }));
                }
                Err(e) if e.is_conflict() => {
                    debug!(
                        product_id = %product_id,
                        attempt = attempt,
                        "Stock changed underneath; re-reading"
                    );
                }
                Err(e) => return Err(EngineError::Store(e)),
            }
        }

        Err(EngineError::DepletionRetriesExhausted {
            product: product_id.to_string(),
            attempts: MAX_CAS_ATTEMPTS,
        })
    }

    /// Best-effort audit entry; failures are logged and swallowed by the
    /// trail.
    async fn write_audit(
        &self,
        user_id: &str,
        applied: &AppliedDecrement,
        actor: &ActorContext,
        source: LogSource,
    ) {
        let entry = InventoryLog {
            id: Uuid::new_v4().to_string(),
            product_id: applied.product_id.clone(),
            product_name: applied.product_name.clone(),
            action: InventoryAction::SaleDepletion,
            previous_quantity: Some(applied.previous_quantity),
            new_quantity: applied.new_quantity,
            difference: Some(applied.new_quantity - applied.previous_quantity),
            previous_price_cents: None,
            new_price_cents: None,
            reason: None,
            user_id: actor.user_id.clone(),
            username: actor.username.clone(),
            user_role: actor.role,
            timestamp: Utc::now(),
            source,
        };

        self.audit.record(user_id, entry).await;
    }

    /// Emits low-stock / out-of-stock alerts for a fresh quantity.
    fn raise_alerts(&self, applied: &AppliedDecrement) {
        let threshold = low_stock_threshold(applied.new_quantity);

        let kind = if applied.new_quantity == 0 {
            Some(AlertKind::OutOfStock)
        } else if applied.new_quantity <= threshold {
            Some(AlertKind::LowStock)
        } else {
            None
        };

        if let Some(kind) = kind {
            self.alerts.publish(StockAlert {
                kind,
                product_id: applied.product_id.clone(),
                product_name: applied.product_name.clone(),
                quantity: applied.new_quantity,
                threshold: if kind == AlertKind::OutOfStock { 0 } else { threshold },
                created_at: Utc::now(),
            });
        }
    }
}

/// Convenience for callers that only need the demand math.
pub fn units_consumed_for(product: &Product, demand: ProductDemand) -> i64 {
    demand.units_consumed(product.per_unit_ml())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tapline_core::{Category, MenuCategory, Recipe, RecipeIngredient, Unit};

    fn pour_item(product_id: &str, ml: f64, sold: i64) -> CartItem {
        let recipe = Recipe {
            id: format!("pour:{}:shot", product_id),
            name: "Shot".to_string(),
            category: MenuCategory::Spirits,
            price_cents: 800,
            ingredients: vec![RecipeIngredient {
                product_id: Some(product_id.to_string()),
                product_name: "Rye".to_string(),
                quantity: ml,
                unit: Unit::Ml,
            }],
            serving_size_ml: Some(ml),
            created_at: Utc::now(),
        };
        CartItem::from_recipe(&recipe, sold)
    }

    fn bottle(id: &str, quantity: i64) -> Product {
        Product {
            id: id.to_string(),
            name: "Rye".to_string(),
            category: Category::Spirits,
            price_cents: 3200,
            quantity,
            unit_label: "bottles".to_string(),
            bottle_volume_ml: Some(750.0),
            origin: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_accumulates_across_lines() {
        let items = vec![pour_item("p1", 44.0, 3), pour_item("p1", 44.0, 2)];
        let plan = depletion_plan(&items);

        let demand = plan.get("p1").unwrap();
        assert!((demand.ml - 220.0).abs() < 1e-9);
        assert_eq!(demand.units, 0);
    }

    #[test]
    fn test_partial_bottles_consume_whole_units() {
        // 17 pours x 44 ml = 748 ml: most of one bottle, consumed whole.
        let plan = depletion_plan(&[pour_item("p1", 44.0, 17)]);
        let demand = plan.get("p1").unwrap();
        assert_eq!(units_consumed_for(&bottle("p1", 1), *demand), 1);

        // One more pour tips into a second bottle.
        let plan = depletion_plan(&[pour_item("p1", 44.0, 18)]);
        let demand = plan.get("p1").unwrap();
        assert_eq!(units_consumed_for(&bottle("p1", 2), *demand), 2);
    }

    #[test]
    fn test_direct_product_demand() {
        let product = bottle("p1", 24);
        let items = vec![CartItem::from_product(&product, 3)];
        let plan = depletion_plan(&items);
        assert_eq!(plan.get("p1").unwrap().units, 3);
        assert_eq!(units_consumed_for(&product, *plan.get("p1").unwrap()), 3);
    }

    #[test]
    fn test_unresolved_ingredients_skipped() {
        let recipe = Recipe {
            id: "r1".to_string(),
            name: "Mystery".to_string(),
            category: MenuCategory::Cocktail,
            price_cents: 900,
            ingredients: vec![RecipeIngredient {
                product_id: None,
                product_name: "Lost".to_string(),
                quantity: 44.0,
                unit: Unit::Ml,
            }],
            serving_size_ml: None,
            created_at: Utc::now(),
        };
        let plan = depletion_plan(&[CartItem::from_recipe(&recipe, 2)]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_threshold_floor_is_one() {
        assert_eq!(low_stock_threshold(0), 1);
        assert_eq!(low_stock_threshold(1), 1);
        assert_eq!(low_stock_threshold(2), 1);
        assert_eq!(low_stock_threshold(4), 1);
        assert_eq!(low_stock_threshold(5), 2);
        assert_eq!(low_stock_threshold(100), 25);
    }
}
