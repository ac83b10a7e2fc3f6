//! # Domain Types
//!
//! Core domain types used throughout Tapline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │    Product    │   │    Recipe     │   │     Sale      │          │
//! │  │  ───────────  │   │  ───────────  │   │  ───────────  │          │
//! │  │  id (UUID)    │   │  id (UUID)    │   │  id (UUID)    │          │
//! │  │  category     │   │  ingredients  │   │  lines        │          │
//! │  │  quantity     │   │  price_cents  │   │  tax/tip      │          │
//! │  │  bottle ml    │   │  serving ml   │   │  immutable    │          │
//! │  └───────────────┘   └───────────────┘   └───────────────┘          │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐          │
//! │  │ InventoryLog  │   │ ActorContext  │   │   Category    │          │
//! │  │  append-only  │   │  who did it   │   │ closed enum   │          │
//! │  └───────────────┘   └───────────────┘   └───────────────┘          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Recipes resolved from the serving catalog are synthetic (never persisted);
//! everything else here round-trips through the store as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::tax::TaxBreakdown;
use crate::units::{default_bottle_ml, Unit};

// =============================================================================
// Categories
// =============================================================================

/// Base stock category of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spirits,
    Wine,
    Beer,
    Soda,
    Juice,
    Other,
}

/// Menu-facing category. Everything a `Category` is, plus `Cocktail` for
/// multi-ingredient recipes, which never exists on raw stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuCategory {
    Spirits,
    Wine,
    Beer,
    Soda,
    Juice,
    Cocktail,
    Other,
}

impl From<Category> for MenuCategory {
    fn from(c: Category) -> Self {
        match c {
            Category::Spirits => MenuCategory::Spirits,
            Category::Wine => MenuCategory::Wine,
            Category::Beer => MenuCategory::Beer,
            Category::Soda => MenuCategory::Soda,
            Category::Juice => MenuCategory::Juice,
            Category::Other => MenuCategory::Other,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A bottle-level stock item.
///
/// `quantity` counts whole units (bottles, cans). It is never persisted
/// negative; the depletion engine clamps at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name ("Pinot Noir Reserve").
    pub name: String,

    /// Base stock category.
    pub category: Category,

    /// Unit price in cents (price of one whole bottle/can).
    pub price_cents: i64,

    /// Discrete stock quantity in whole units.
    pub quantity: i64,

    /// Human-readable unit label ("bottles", "cans").
    pub unit_label: String,

    /// Per-unit volume in millilitres, when known.
    pub bottle_volume_ml: Option<f64>,

    /// Optional origin metadata ("Niagara, ON").
    pub origin: Option<String>,

    /// Optional image reference.
    pub image_url: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Explicit bottle volume, filtered to usable (strictly positive) values.
    pub fn bottle_ml(&self) -> Option<f64> {
        self.bottle_volume_ml.filter(|v| *v > 0.0)
    }

    /// Deliverable volume of one unit: the explicit bottle volume, or the
    /// category default when none is recorded.
    pub fn per_unit_ml(&self) -> f64 {
        self.bottle_ml()
            .unwrap_or_else(|| default_bottle_ml(self.category))
    }
}

// =============================================================================
// Recipe
// =============================================================================

/// One ingredient line of a recipe.
///
/// `product_id` is `None` when the ingredient could not be resolved to a
/// stock item ("sourceMissing"). Unresolved ingredients block sale creation
/// and force availability to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    pub product_id: Option<String>,
    /// Name snapshot, kept readable even when the source product is gone.
    pub product_name: String,
    /// Required amount per serving, in `unit`.
    pub quantity: f64,
    pub unit: Unit,
}

impl RecipeIngredient {
    /// Whether this ingredient resolves to a stock item.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.product_id.is_some()
    }
}

/// A named sellable item composed of ingredient references.
///
/// Covers both hand-built cocktails and the synthetic single-ingredient
/// pour items derived by the serving catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub category: MenuCategory,
    /// Sale price per serving, in cents.
    pub price_cents: i64,
    /// Ordered ingredient list.
    pub ingredients: Vec<RecipeIngredient>,
    /// Optional serving size in millilitres.
    pub serving_size_ml: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    /// Returns the serving price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether every ingredient resolves to a stock item.
    pub fn is_resolved(&self) -> bool {
        self.ingredients.iter().all(RecipeIngredient::is_resolved)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A line item on a persisted sale. Snapshot pattern: name, category and
/// price are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    /// Product or recipe id this line was sold from.
    pub item_id: String,
    pub name: String,
    pub category: MenuCategory,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// True when the line references a recipe (incl. synthetic pours).
    pub is_recipe: bool,
}

impl SaleLine {
    /// Line total before tax.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// A completed, immutable sale record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub lines: Vec<SaleLine>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    /// Structured breakdown when the sale was written by a version that
    /// recorded one; older sales carry only `tax_cents`.
    pub tax_breakdown: Option<TaxBreakdown>,
    pub tip_cents: i64,
    pub total_cents: i64,
    /// Free-form at rest ("cash", "Visa", "square"); normalized at export.
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Actor / Roles
// =============================================================================

/// Resolved role of the operator, consumed read-only from the auth boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
}

/// Who is performing a stock-affecting action. Threaded into every
/// depletion/audit call instead of being read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

// =============================================================================
// Inventory Log
// =============================================================================

/// What kind of stock-affecting action a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAction {
    /// Automatic decrement from a completed sale.
    SaleDepletion,
    /// Operator-entered quantity change outside a sale.
    ManualAdjustment,
    /// Stock received.
    Restock,
    /// Unit price changed.
    PriceChange,
}

/// Where a log entry originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSource {
    Checkout,
    TabSettlement,
    Inventory,
}

/// Append-only audit entry for one stock-affecting action.
/// Never mutated or deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLog {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub action: InventoryAction,
    pub previous_quantity: Option<i64>,
    pub new_quantity: i64,
    /// new - previous, when the previous quantity is known.
    pub difference: Option<i64>,
    pub previous_price_cents: Option<i64>,
    pub new_price_cents: Option<i64>,
    /// Operator-entered free text for manual actions.
    pub reason: Option<String>,
    pub user_id: String,
    pub username: String,
    pub user_role: Role,
    pub timestamp: DateTime<Utc>,
    pub source: LogSource,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(category: Category, bottle_ml: Option<f64>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Test".to_string(),
            category,
            price_cents: 2100,
            quantity: 1,
            unit_label: "bottles".to_string(),
            bottle_volume_ml: bottle_ml,
            origin: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bottle_ml_filters_non_positive() {
        assert_eq!(product(Category::Wine, Some(750.0)).bottle_ml(), Some(750.0));
        assert_eq!(product(Category::Wine, Some(0.0)).bottle_ml(), None);
        assert_eq!(product(Category::Wine, Some(-1.0)).bottle_ml(), None);
        assert_eq!(product(Category::Wine, None).bottle_ml(), None);
    }

    #[test]
    fn test_per_unit_ml_falls_back_to_category_default() {
        assert_eq!(product(Category::Wine, None).per_unit_ml(), 750.0);
        assert_eq!(product(Category::Beer, None).per_unit_ml(), 341.0);
        assert_eq!(product(Category::Beer, Some(500.0)).per_unit_ml(), 500.0);
    }

    #[test]
    fn test_recipe_resolution() {
        let resolved = RecipeIngredient {
            product_id: Some("p1".to_string()),
            product_name: "Gin".to_string(),
            quantity: 44.0,
            unit: Unit::Ml,
        };
        let missing = RecipeIngredient {
            product_id: None,
            product_name: "Tonic".to_string(),
            quantity: 120.0,
            unit: Unit::Ml,
        };

        let recipe = Recipe {
            id: "r1".to_string(),
            name: "G&T".to_string(),
            category: MenuCategory::Cocktail,
            price_cents: 1200,
            ingredients: vec![resolved.clone(), missing],
            serving_size_ml: None,
            created_at: Utc::now(),
        };
        assert!(!recipe.is_resolved());

        let recipe_ok = Recipe {
            ingredients: vec![resolved],
            ..recipe
        };
        assert!(recipe_ok.is_resolved());
    }

    #[test]
    fn test_sale_line_total() {
        let line = SaleLine {
            item_id: "r1".to_string(),
            name: "G&T".to_string(),
            category: MenuCategory::Cocktail,
            quantity: 3,
            unit_price_cents: 1200,
            is_recipe: true,
        };
        assert_eq!(line.line_total_cents(), 3600);
    }
}
