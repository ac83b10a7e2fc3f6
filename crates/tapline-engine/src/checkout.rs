//! # Checkout Service
//!
//! The straight-through sale path: validate, re-check availability against
//! live stock, persist the sale, then deplete and audit best-effort.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  cart ──► validate ──► availability re-check ──► INSERT sale            │
//! │             │                  │                      │                 │
//! │        reject, no        reject, no                   ▼                 │
//! │        side effects      side effects          depletion + audit        │
//! │                                                (best-effort: failures   │
//! │                                                 logged, sale stands)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything left of the INSERT is free to fail; nothing right of it may
//! take the sale down with it.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use tapline_core::availability::servings_available;
use tapline_core::tax::TaxConfig;
use tapline_core::validation::validate_quantity;
use tapline_core::{
    ActorContext, Cart, CartSource, CoreError, LogSource, MenuCategory, PaymentMethod, Recipe,
    Sale, SaleLine, ValidationError,
};
use tapline_store::Store;

use crate::depletion::{depletion_plan, DepletionEngine};
use crate::error::EngineResult;

/// Checkout orchestration for immediate (cash/card) sales.
pub struct CheckoutService {
    store: Store,
    config: TaxConfig,
    depletion: DepletionEngine,
}

impl CheckoutService {
    pub fn new(store: Store, config: TaxConfig, depletion: DepletionEngine) -> Self {
        CheckoutService {
            store,
            config,
            depletion,
        }
    }

    /// Completes a cash or card sale from the cart.
    ///
    /// Rejections (validation, availability) happen before any write.
    /// Once the sale row is inserted, depletion and audit failures are
    /// logged but the sale stands.
    pub async fn checkout(
        &self,
        user_id: &str,
        cart: &Cart,
        actor: &ActorContext,
    ) -> EngineResult<Sale> {
        self.validate(cart)?;
        self.check_availability(user_id, cart).await?;

        let sale = self.build_sale(cart);
        self.store.sales().insert(user_id, &sale).await?;
        info!(
            user_id = %user_id,
            sale_id = %sale.id,
            total_cents = sale.total_cents,
            payment = %sale.payment_method,
            "Sale completed"
        );

        let report = self
            .depletion
            .run(user_id, &cart.items, actor, LogSource::Checkout)
            .await;
        if !report.failures.is_empty() {
            warn!(
                sale_id = %sale.id,
                failures = report.failures.len(),
                "Sale committed with partial depletion"
            );
        }

        Ok(sale)
    }

    /// Pure structural checks. No reads, no writes.
    fn validate(&self, cart: &Cart) -> EngineResult<()> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        // Settling onto a tab goes through the tab ledger, which needs an
        // open tab target; this path handles immediate settlement only.
        if cart.payment_method == PaymentMethod::Tab {
            return Err(CoreError::NoTabSelected.into());
        }

        for item in &cart.items {
            validate_quantity(item.quantity).map_err(CoreError::from)?;

            if let CartSource::Recipe { ingredients, .. } = &item.source {
                for ingredient in ingredients {
                    if !ingredient.is_resolved() {
                        return Err(CoreError::UnresolvedIngredient {
                            recipe: item.name.clone(),
                            ingredient: ingredient.product_name.clone(),
                        }
                        .into());
                    }
                    if ingredient.quantity <= 0.0 {
                        return Err(CoreError::from(ValidationError::MustBePositive {
                            field: format!("ingredient '{}' quantity", ingredient.product_name),
                        })
                        .into());
                    }
                }
            }
        }

        Ok(())
    }

    /// Re-checks the cart against live stock. Lines are checked at serving
    /// granularity first, then demand is aggregated per product: two lines
    /// pouring from the same bottle can each fit on their own and still
    /// exceed the bottle together. The aggregate uses the same plan the
    /// depletion engine applies, so the check and the decrement cannot
    /// disagree. An insufficient cart rejects the whole purchase as a
    /// normal outcome, not an exception.
    async fn check_availability(&self, user_id: &str, cart: &Cart) -> EngineResult<()> {
        let products = self.store.products().list(user_id).await?;

        for item in &cart.items {
            match &item.source {
                CartSource::Product { product_id } => {
                    let available = products
                        .iter()
                        .find(|p| &p.id == product_id)
                        .map(|p| p.quantity.max(0))
                        .unwrap_or(0);

                    if available < item.quantity {
                        return Err(CoreError::InsufficientStock {
                            name: item.name.clone(),
                            available,
                            requested: item.quantity,
                        }
                        .into());
                    }
                }
                CartSource::Recipe { recipe_id, ingredients } => {
                    let recipe = line_recipe(recipe_id, &item.name, item.category, ingredients);
                    let available = servings_available(&recipe, &products);

                    if available < item.quantity {
                        return Err(CoreError::InsufficientStock {
                            name: item.name.clone(),
                            available,
                            requested: item.quantity,
                        }
                        .into());
                    }
                }
            }
        }

        // Demand summed across every line that draws on the product.
        for (product_id, demand) in depletion_plan(&cart.items) {
            let Some(product) = products.iter().find(|p| p.id == product_id) else {
                return Err(CoreError::ProductNotFound(product_id).into());
            };

            let available = product.quantity.max(0);
            let consumed = demand.units_consumed(product.per_unit_ml());
            if consumed > available {
                return Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available,
                    requested: consumed,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Freezes the cart into an immutable sale record.
    fn build_sale(&self, cart: &Cart) -> Sale {
        let totals = cart.totals(&self.config);

        Sale {
            id: Uuid::new_v4().to_string(),
            lines: cart
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
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax.total_cents,
            tax_breakdown: Some(totals.tax),
            tip_cents: totals.tip_cents,
            total_cents: totals.total_cents,
            payment_method: match cart.payment_method {
                PaymentMethod::Cash => "cash".to_string(),
                PaymentMethod::Card => "card".to_string(),
                PaymentMethod::Tab => "tab".to_string(),
            },
            created_at: Utc::now(),
        }
    }
}

/// Rebuilds a throwaway recipe view of a cart line for the availability
/// calculator, from the ingredient list frozen at add time.
fn line_recipe(
    recipe_id: &str,
    name: &str,
    category: MenuCategory,
    ingredients: &[tapline_core::RecipeIngredient],
) -> Recipe {
    Recipe {
        id: recipe_id.to_string(),
        name: name.to_string(),
        category,
        price_cents: 0,
        ingredients: ingredients.to_vec(),
        serving_size_ml: None,
        created_at: Utc::now(),
    }
}
