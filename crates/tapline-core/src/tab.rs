//! # Tab Domain Rules
//!
//! A tab is an open running account: a snapshot of cart items that keeps
//! absorbing further rounds until one settlement pays the whole thing.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   open ──(payment completed)──► paid ──(close)──► removed           │
//! │    │ ▲                                                              │
//! │    │ └── merge additional cart rounds                               │
//! │    │                                                                │
//! │    └──(close)──► ✗ REJECTED: an open tab cannot be discarded        │
//! │                    without going through payment                    │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence and settlement side effects live in the engine's TabLedger;
//! this module owns the pure rules. Card references are reduced to their
//! last four digits at construction, so a full number never reaches a Tab
//! value, let alone the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::CartItem;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::{self, TaxConfig};
use crate::validation::{card_last4, validate_tab_name};

// =============================================================================
// Tab
// =============================================================================

/// Settlement status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    Open,
    Paid,
}

/// An open credit account for a named guest or table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub name: String,
    /// Last four digits of the card held behind the bar, if any.
    pub card_last4: Option<String>,
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: TabStatus,
}

impl Tab {
    /// Opens a tab from a cart snapshot.
    ///
    /// `card_reference` may be a full card number from a swipe; only its
    /// last four digits are kept.
    pub fn open(
        name: &str,
        card_reference: Option<&str>,
        items: Vec<CartItem>,
        config: &TaxConfig,
    ) -> CoreResult<Tab> {
        validate_tab_name(name)?;

        let card_last4 = match card_reference {
            Some(reference) => Some(card_last4(reference)?),
            None => None,
        };

        let mut tab = Tab {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            card_last4,
            items,
            created_at: Utc::now(),
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            status: TabStatus::Open,
        };
        tab.recompute(config);
        Ok(tab)
    }

    /// Merges another round of cart items into this tab.
    ///
    /// Lines matching an existing item id have quantities summed; the rest
    /// are appended. Only open tabs accept new rounds.
    pub fn merge_items(&mut self, incoming: Vec<CartItem>, config: &TaxConfig) -> CoreResult<()> {
        if self.status != TabStatus::Open {
            return Err(CoreError::TabAlreadyPaid {
                name: self.name.clone(),
            });
        }

        for item in incoming {
            match self.items.iter_mut().find(|i| i.item_id == item.item_id) {
                Some(existing) => existing.quantity += item.quantity,
                None => self.items.push(item),
            }
        }

        self.recompute(config);
        Ok(())
    }

    /// Recomputes subtotal/tax/total from the item list, using the same
    /// tax engine call the cart uses.
    pub fn recompute(&mut self, config: &TaxConfig) {
        let subtotal: i64 = self.items.iter().map(|i| i.line_total_cents()).sum();
        let breakdown = tax::compute(Money::from_cents(subtotal), config);

        self.subtotal_cents = subtotal;
        self.tax_cents = breakdown.total_cents;
        self.total_cents = subtotal + breakdown.total_cents;
    }

    /// Marks the tab paid. Idempotent at this level; the ledger guards the
    /// transition against concurrent settlement.
    pub fn mark_paid(&mut self) {
        self.status = TabStatus::Paid;
    }

    /// Checks the removal rule: only a paid tab may leave the open set.
    pub fn ensure_closable(&self) -> CoreResult<()> {
        match self.status {
            TabStatus::Paid => Ok(()),
            TabStatus::Open => Err(CoreError::TabStillOpen {
                name: self.name.clone(),
            }),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
