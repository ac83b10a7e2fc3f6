//! # Cart State Machine
//!
//! The in-memory order being built at the register.
//!
//! ## States and Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Cart Lifecycle                                 │
//! │                                                                     │
//! │  empty ──add──► populated ──totals(cfg)──► priced                   │
//! │                    │                          │                     │
//! │                    │                          ├──► checked out      │
//! │   add item ────────┤                          │     (CheckoutSvc)   │
//! │   remove item ─────┤                          └──► merged into tab  │
//! │   set quantity ────┤                                (TabLedger)     │
//! │   clear ───────────┘                                                │
//! │                                                                     │
//! │  Every pricing pass recomputes from scratch:                        │
//! │    subtotal = Σ(unit price × qty)                                   │
//! │    tax      = TaxEngine(subtotal, config)     ← passed explicitly   │
//! │    tip      = % of (subtotal + tax) or fixed  ← card payments only  │
//! │    total    = subtotal + tax (+ tip if card)                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cash tips are handled out-of-band at the till and never enter the total.
//! Paying by tab is recorded here but enforced by the engine's tab ledger,
//! which requires an open tab target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::{self, TaxBreakdown, TaxConfig};
use crate::types::{MenuCategory, Product, Recipe, RecipeIngredient};
use crate::validation::{validate_cart_size, validate_quantity};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Payment & Tip
// =============================================================================

/// How the operator intends to settle the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    /// Push the order onto an open tab instead of settling now.
    Tab,
}

/// Operator-entered tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Tip {
    #[default]
    None,
    /// Percentage of (subtotal + tax), in basis points (1500 = 15%).
    PercentBps(u32),
    /// Explicit amount in cents.
    AmountCents(i64),
}

// =============================================================================
// Cart Items
// =============================================================================

/// What a cart line was sold from. Recipe lines freeze their ingredient
/// list so depletion works even for ephemeral pour items that exist only
/// in the derived catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CartSource {
    Product { product_id: String },
    Recipe { recipe_id: String, ingredients: Vec<RecipeIngredient> },
}

/// One line of the active order. Price and name are frozen at add time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Product or recipe id; also the merge key for repeated adds.
    pub item_id: String,
    pub name: String,
    pub category: MenuCategory,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub source: CartSource,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            item_id: product.id.clone(),
            name: product.name.clone(),
            category: product.category.into(),
            unit_price_cents: product.price_cents,
            quantity,
            source: CartSource::Product {
                product_id: product.id.clone(),
            },
            added_at: Utc::now(),
        }
    }

    pub fn from_recipe(recipe: &Recipe, quantity: i64) -> Self {
        CartItem {
            item_id: recipe.id.clone(),
            name: recipe.name.clone(),
            category: recipe.category,
            unit_price_cents: recipe.price_cents,
            quantity,
            source: CartSource::Recipe {
                recipe_id: recipe.id.clone(),
                ingredients: recipe.ingredients.clone(),
            },
            added_at: Utc::now(),
        }
    }

    /// Whether the line references a recipe (incl. synthetic pours).
    #[inline]
    pub fn is_recipe(&self) -> bool {
        matches!(self.source, CartSource::Recipe { .. })
    }

    /// Line total before tax.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The active order.
///
/// ## Invariants
/// - Lines are unique by `item_id`; adding the same item merges quantities.
/// - Quantities stay in 1..=MAX_ITEM_QUANTITY; setting ≤0 removes the line.
/// - At most MAX_CART_ITEMS distinct lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub tip: Tip,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            tip: Tip::None,
            payment_method: PaymentMethod::Cash,
            created_at: Utc::now(),
        }
    }

    /// Adds a direct product line, merging with an existing line for the
    /// same product.
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.add_item(CartItem::from_product(product, quantity))
    }

    /// Adds a recipe line (hand-built or derived pour item).
    pub fn add_recipe(&mut self, recipe: &Recipe, quantity: i64) -> CoreResult<()> {
        self.add_item(CartItem::from_recipe(recipe, quantity))
    }

    fn add_item(&mut self, item: CartItem) -> CoreResult<()> {
        validate_quantity(item.quantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.item_id == item.item_id) {
            let new_qty = existing.quantity + item.quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            existing.quantity = new_qty;
            return Ok(());
        }

        validate_cart_size(self.items.len())?;
        self.items.push(item);
        Ok(())
    }

    /// Sets the quantity of a line; ≤0 removes it.
    pub fn set_quantity(&mut self, item_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_item(item_id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        match self.items.iter_mut().find(|i| i.item_id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ItemNotInCart(item_id.to_string())),
        }
    }

    /// Removes a line by item id.
    pub fn remove_item(&mut self, item_id: &str) -> CoreResult<()> {
        let before = self.items.len();
        self.items.retain(|i| i.item_id != item_id);

        if self.items.len() == before {
            Err(CoreError::ItemNotInCart(item_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears the order: items, tip and payment method all reset.
    pub fn clear(&mut self) {
        self.items.clear();
        self.tip = Tip::None;
        self.payment_method = PaymentMethod::Cash;
        self.created_at = Utc::now();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Subtotal before tax.
    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(|i| i.line_total_cents()).sum()
    }

    /// Prices the cart under the given tax configuration.
    pub fn totals(&self, config: &TaxConfig) -> CartTotals {
        let subtotal = Money::from_cents(self.subtotal_cents());
        let tax = tax::compute(subtotal, config);

        // Tips ride the card payment; cash tips stay in the jar.
        let tip_cents = if self.payment_method == PaymentMethod::Card {
            match self.tip {
                Tip::None => 0,
                Tip::PercentBps(bps) => (subtotal + tax.total()).percent_bps(bps).cents(),
                Tip::AmountCents(cents) => cents.max(0),
            }
        } else {
            0
        };

        let total_cents = subtotal.cents() + tax.total_cents + tip_cents;

        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            subtotal_cents: subtotal.cents(),
            tax,
            tip_cents,
            total_cents,
        }
    }
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

/// Priced cart summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
    pub tax: TaxBreakdown,
    pub tip_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
