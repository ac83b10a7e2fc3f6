//! # Availability Calculator
//!
//! How many full servings of a recipe can be sold with current stock.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  For each ingredient:                                               │
//! │                                                                     │
//! │    unresolved product id ───────────────► availability = 0          │
//! │                                            (fail closed)            │
//! │    volume unit (ml/oz/cl/l):                                        │
//! │      required_ml  = convert(quantity)                               │
//! │      total_ml     = stock_qty × per_unit_ml                         │
//! │      servings     = floor(total_ml / required_ml)                   │
//! │                                                                     │
//! │    discrete unit:                                                   │
//! │      servings     = floor(stock_qty / required_units)               │
//! │                                                                     │
//! │  recipe availability = min over ingredients                         │
//! │  empty ingredient list = 1 (always sellable)                        │
//! │  never negative; empty stock yields 0, not an error                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{Product, Recipe, RecipeIngredient};

/// Servings of one ingredient the given stock supports.
///
/// Returns 0 for unresolved ingredients, missing products, non-positive
/// requirements, and empty stock.
pub fn ingredient_servings(ingredient: &RecipeIngredient, products: &[Product]) -> i64 {
    let Some(product_id) = ingredient.product_id.as_deref() else {
        return 0;
    };
    let Some(product) = products.iter().find(|p| p.id == product_id) else {
        return 0;
    };

    if ingredient.quantity <= 0.0 {
        return 0;
    }

    let stock_units = product.quantity.max(0);

    match ingredient.unit.to_ml(ingredient.quantity) {
        Some(required_ml) => {
            let total_ml = stock_units as f64 * product.per_unit_ml();
            (total_ml / required_ml).floor() as i64
        }
        None => {
            // Discrete requirement: whole units per serving.
            (stock_units as f64 / ingredient.quantity).floor() as i64
        }
    }
}

/// Maximum number of full servings of `recipe` sellable from `products`.
///
/// The minimum across all ingredients; an empty ingredient list counts as
/// always available (1).
pub fn servings_available(recipe: &Recipe, products: &[Product]) -> i64 {
    if recipe.ingredients.is_empty() {
        return 1;
    }

    recipe
        .ingredients
        .iter()
        .map(|ingredient| ingredient_servings(ingredient, products))
        .min()
        .unwrap_or(0)
        .max(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
