//! # Tab Ledger
//!
//! Orchestrates the tab lifecycle against the store: open from a cart
//! snapshot, merge further rounds, settle exactly once, close after
//! payment.
//!
//! ## Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  settle(tab) ──► store: UPDATE status='paid' WHERE status='open'        │
//! │                     │                                                   │
//! │          won ◄──────┴──────► lost (already paid)                        │
//! │           │                        │                                    │
//! │           ▼                        ▼                                    │
//! │  persist Sale record        AlreadySettled: no sale, no depletion,      │
//! │  deplete stock              no double charge                            │
//! │  (best-effort)                                                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tapline_core::tax::{self, TaxConfig};
use tapline_core::{
    ActorContext, CartItem, CoreError, LogSource, Money, Sale, SaleLine, Tab,
};
use tapline_store::{SettleOutcome, Store};

use crate::depletion::DepletionEngine;
use crate::error::EngineResult;

/// Result of a settlement call.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// This call performed the settlement; the sale record is returned.
    Settled(Sale),
    /// The tab had already been paid. Nothing was charged or depleted.
    AlreadySettled,
}

/// Tab lifecycle orchestration.
pub struct TabLedger {
    store: Store,
    config: TaxConfig,
    depletion: DepletionEngine,
}

impl TabLedger {
    pub fn new(store: Store, config: TaxConfig, depletion: DepletionEngine) -> Self {
        TabLedger {
            store,
            config,
            depletion,
        }
    }

    /// Opens a tab from a cart snapshot.
    pub async fn open(
        &self,
        user_id: &str,
        name: &str,
        card_reference: Option<&str>,
        items: Vec<CartItem>,
    ) -> EngineResult<Tab> {
        if items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        let tab = Tab::open(name, card_reference, items, &self.config)?;
        self.store.tabs().insert(user_id, &tab).await?;

        info!(user_id = %user_id, tab_id = %tab.id, name = %tab.name, "Tab opened");
        Ok(tab)
    }

    /// Lists open tabs.
    pub async fn open_tabs(&self, user_id: &str) -> EngineResult<Vec<Tab>> {
        Ok(self.store.tabs().list_open(user_id).await?)
    }

    /// Merges another round into an open tab and persists the result.
    pub async fn merge(
        &self,
        user_id: &str,
        tab_id: &str,
        items: Vec<CartItem>,
    ) -> EngineResult<Tab> {
        let mut tab = self.load(user_id, tab_id).await?;
        tab.merge_items(items, &self.config)?;

        // Guarded write; a settlement racing the merge surfaces as Conflict
        // and the round is not silently added to a paid tab.
        self.store.tabs().update_open(user_id, &tab).await?;
        Ok(tab)
    }

    /// Settles a tab: open → paid exactly once.
    ///
    /// The sale record and stock depletion run only on the call that wins
    /// the transition. Settling an already-paid tab returns
    /// `AlreadySettled` and has no side effects.
    pub async fn settle(
        &self,
        user_id: &str,
        tab_id: &str,
        payment_method: &str,
        tip_cents: i64,
        actor: &ActorContext,
    ) -> EngineResult<Settlement> {
        let tab = self.load(user_id, tab_id).await?;

        match self.store.tabs().try_settle(user_id, tab_id).await? {
            SettleOutcome::AlreadyPaid => {
                info!(user_id = %user_id, tab_id = %tab_id, "Tab already settled; no-op");
                Ok(Settlement::AlreadySettled)
            }
            SettleOutcome::Settled => {
                let sale = self.sale_from_tab(&tab, payment_method, tip_cents);
                self.store.sales().insert(user_id, &sale).await?;

                let report = self
                    .depletion
                    .run(user_id, &tab.items, actor, LogSource::TabSettlement)
                    .await;
                if !report.failures.is_empty() {
                    warn!(
                        tab_id = %tab_id,
                        failures = report.failures.len(),
                        "Tab settled with partial depletion"
                    );
                }

                info!(
                    user_id = %user_id,
                    tab_id = %tab_id,
                    sale_id = %sale.id,
                    total_cents = sale.total_cents,
                    "Tab settled"
                );
                Ok(Settlement::Settled(sale))
            }
        }
    }

    /// Removes a tab from the open set. Only paid tabs can leave; an open
    /// tab must go through settlement first.
    pub async fn close(&self, user_id: &str, tab_id: &str) -> EngineResult<()> {
        let tab = self.load(user_id, tab_id).await?;
        tab.ensure_closable()?;

        self.store.tabs().delete_paid(user_id, tab_id).await?;
        info!(user_id = %user_id, tab_id = %tab_id, "Tab closed");
        Ok(())
    }

    async fn load(&self, user_id: &str, tab_id: &str) -> EngineResult<Tab> {
        self.store
            .tabs()
            .get(user_id, tab_id)
            .await?
            .ok_or_else(|| CoreError::TabNotFound(tab_id.to_string()).into())
    }

    /// Builds the immutable sale record for a settled tab. The breakdown is
    /// recomputed from the tab's subtotal under the active configuration;
    /// tax and total on the record both derive from that one breakdown.
    fn sale_from_tab(&self, tab: &Tab, payment_method: &str, tip_cents: i64) -> Sale {
        let breakdown = tax::compute(Money::from_cents(tab.subtotal_cents), &self.config);
        let tax_cents = breakdown.total_cents;
        let tip_cents = tip_cents.max(0);

        Sale {
            id: Uuid::new_v4().to_string(),
            lines: tab
                .items
                .iter()
                .map(|item| SaleLine {
                    item_id: item.item_id.clone(),
                    name: item.name.clone(),
                    category: item.category,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price_cents,
                    is_recipe: item.is_recipe(),
                })
                .collect(),
            subtotal_cents: tab.subtotal_cents,
            tax_cents,
            tax_breakdown: Some(breakdown),
            tip_cents,
            total_cents: tab.subtotal_cents + tax_cents + tip_cents,
            payment_method: payment_method.to_string(),
            created_at: Utc::now(),
        }
    }
}
