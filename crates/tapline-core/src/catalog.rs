//! # Serving Catalog
//!
//! Derives sellable "pour" items from bottle-level stock.
//!
//! ## Derivation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Product: "House Red", wine, 750 ml bottle, $21.00                  │
//! │       │                                                             │
//! │       ▼  format: Glass (150 ml), margin 180%                        │
//! │  servings_per_bottle = max(1, 750 / 150) = 5                        │
//! │  cost_per_serving    = $21.00 / 5        = $4.20                    │
//! │  final_price         = $4.20 × 2.80      = $11.76                   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Synthetic Recipe "House Red (Glass 150 ml)"                        │
//! │    ingredients: [150 ml of "House Red"]                             │
//! │                                                                     │
//! │  Products with no usable bottle volume or a non-positive price      │
//! │  are skipped: no division by zero, no fabricated prices.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The synthetic items are ephemeral (never persisted). Because they are
//! ordinary single-ingredient recipes, availability and depletion treat
//! them exactly like hand-built cocktails.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Category, Product, Recipe, RecipeIngredient};
use crate::units::Unit;

// =============================================================================
// Formats
// =============================================================================

/// A fixed serving format for one base category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServingFormat {
    /// Stable identifier used in margin overrides and synthetic recipe ids.
    pub id: &'static str,
    /// Operator-facing label.
    pub label: &'static str,
    /// Pour volume in millilitres.
    pub volume_ml: f64,
    /// Default margin percentage applied over cost per serving.
    pub default_margin_pct: f64,
    /// Assumed bottle volume when pricing needs one for display purposes.
    pub default_bottle_ml: f64,
}

const SPIRITS_FORMATS: &[ServingFormat] = &[
    ServingFormat {
        id: "shot",
        label: "Shot (44 ml)",
        volume_ml: 44.0,
        default_margin_pct: 300.0,
        default_bottle_ml: 750.0,
    },
    ServingFormat {
        id: "double",
        label: "Double (88 ml)",
        volume_ml: 88.0,
        default_margin_pct: 250.0,
        default_bottle_ml: 750.0,
    },
];

const WINE_FORMATS: &[ServingFormat] = &[
    ServingFormat {
        id: "glass",
        label: "Glass (150 ml)",
        volume_ml: 150.0,
        default_margin_pct: 180.0,
        default_bottle_ml: 750.0,
    },
    ServingFormat {
        id: "taster",
        label: "Taster (75 ml)",
        volume_ml: 75.0,
        default_margin_pct: 220.0,
        default_bottle_ml: 750.0,
    },
];

const BEER_FORMATS: &[ServingFormat] = &[ServingFormat {
    id: "bottle",
    label: "Bottle (341 ml)",
    volume_ml: 341.0,
    default_margin_pct: 150.0,
    default_bottle_ml: 341.0,
}];

/// The serving formats defined for a category. Categories without pour
/// service (soda, juice, other) sell by the unit and have none.
pub fn formats_for(category: Category) -> &'static [ServingFormat] {
    match category {
        Category::Spirits => SPIRITS_FORMATS,
        Category::Wine => WINE_FORMATS,
        Category::Beer => BEER_FORMATS,
        Category::Soda | Category::Juice | Category::Other => &[],
    }
}

// =============================================================================
// Margin Overrides
// =============================================================================

/// Per-format margin overrides, keyed by (category, format id).
///
/// Persisted client-side by the settings surface; this core only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarginOverrides {
    overrides: HashMap<String, f64>,
}

impl MarginOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(category: Category, format_id: &str) -> String {
        format!("{:?}:{}", category, format_id).to_lowercase()
    }

    pub fn set(&mut self, category: Category, format_id: &str, margin_pct: f64) {
        self.overrides
            .insert(Self::key(category, format_id), margin_pct);
    }

    pub fn get(&self, category: Category, format_id: &str) -> Option<f64> {
        self.overrides.get(&Self::key(category, format_id)).copied()
    }

    /// The margin to apply: the override if present, else the format default.
    pub fn effective(&self, category: Category, format: &ServingFormat) -> f64 {
        self.get(category, format.id)
            .unwrap_or(format.default_margin_pct)
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Builds the synthetic recipe id for a pour item.
pub fn pour_item_id(product_id: &str, format_id: &str) -> String {
    format!("pour:{}:{}", product_id, format_id)
}

/// Derives one pour item, or `None` when the product cannot be priced
/// (no usable bottle volume, or non-positive price).
pub fn pour_item(
    product: &Product,
    format: &ServingFormat,
    overrides: &MarginOverrides,
) -> Option<Recipe> {
    let bottle_ml = product.bottle_ml()?;
    if product.price_cents <= 0 {
        return None;
    }

    let servings_per_bottle = (bottle_ml / format.volume_ml).max(1.0);
    let cost_per_serving = product.price_cents as f64 / servings_per_bottle;
    let margin = overrides.effective(product.category, format);
    let final_price_cents = (cost_per_serving * (1.0 + margin / 100.0)).round() as i64;

    Some(Recipe {
        id: pour_item_id(&product.id, format.id),
        name: format!("{} ({})", product.name, format.label),
        category: product.category.into(),
        price_cents: final_price_cents,
        ingredients: vec![RecipeIngredient {
            product_id: Some(product.id.clone()),
            product_name: product.name.clone(),
            quantity: format.volume_ml,
            unit: Unit::Ml,
        }],
        serving_size_ml: Some(format.volume_ml),
        created_at: product.created_at,
    })
}

/// Derives the full pour catalog for the given stock.
///
/// Output order is stable: products in input order, formats in table order.
pub fn pour_catalog(products: &[Product], overrides: &MarginOverrides) -> Vec<Recipe> {
    products
        .iter()
        .flat_map(|product| {
            formats_for(product.category)
                .iter()
                .filter_map(|format| pour_item(product, format, overrides))
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wine(price_cents: i64, bottle_ml: Option<f64>) -> Product {
        Product {
            id: "w1".to_string(),
            name: "House Red".to_string(),
            category: Category::Wine,
            price_cents,
            quantity: 6,
            unit_label: "bottles".to_string(),
            bottle_volume_ml: bottle_ml,
            origin: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_wine_glass_scenario() {
        // 750 ml bottle at $21.00, 150 ml glass, 180% margin:
        // 5 servings, $4.20 cost, $11.76 final.
        let product = wine(2100, Some(750.0));
        let glass = &WINE_FORMATS[0];
        let item = pour_item(&product, glass, &MarginOverrides::new()).unwrap();

        assert_eq!(item.price_cents, 1176);
        assert_eq!(item.ingredients.len(), 1);
        assert_eq!(item.ingredients[0].quantity, 150.0);
        assert_eq!(item.ingredients[0].unit, Unit::Ml);
        assert_eq!(item.ingredients[0].product_id.as_deref(), Some("w1"));
        assert_eq!(item.id, "pour:w1:glass");
    }

    #[test]
    fn test_margin_override_wins() {
        let product = wine(2100, Some(750.0));
        let mut overrides = MarginOverrides::new();
        overrides.set(Category::Wine, "glass", 100.0);

        let item = pour_item(&product, &WINE_FORMATS[0], &overrides).unwrap();
        // $4.20 cost at 100% margin = $8.40
        assert_eq!(item.price_cents, 840);
    }

    #[test]
    fn test_small_bottle_clamps_to_one_serving() {
        // 100 ml bottle with a 150 ml format: servings clamp to 1, so the
        // pour never costs less than the whole bottle.
        let product = wine(1000, Some(100.0));
        let item = pour_item(&product, &WINE_FORMATS[0], &MarginOverrides::new()).unwrap();
        // cost = $10.00, margin 180% -> $28.00
        assert_eq!(item.price_cents, 2800);
    }

    #[test]
    fn test_unpriceable_products_excluded() {
        let no_volume = wine(2100, None);
        let zero_volume = wine(2100, Some(0.0));
        let free = wine(0, Some(750.0));

        let fmt = &WINE_FORMATS[0];
        let overrides = MarginOverrides::new();
        assert!(pour_item(&no_volume, fmt, &overrides).is_none());
        assert!(pour_item(&zero_volume, fmt, &overrides).is_none());
        assert!(pour_item(&free, fmt, &overrides).is_none());
    }

    #[test]
    fn test_catalog_covers_all_formats() {
        let products = vec![wine(2100, Some(750.0))];
        let catalog = pour_catalog(&products, &MarginOverrides::new());
        // Wine has two formats: glass and taster.
        assert_eq!(catalog.len(), 2);
        assert!(catalog.iter().all(|r| r.is_resolved()));
    }

    #[test]
    fn test_soda_has_no_formats() {
        assert!(formats_for(Category::Soda).is_empty());
        assert!(formats_for(Category::Juice).is_empty());
    }
}
