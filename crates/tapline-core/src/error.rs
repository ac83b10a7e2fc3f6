//! # Error Types
//!
//! Domain error types for tapline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  tapline-core (this file)                                           │
//! │  ├── CoreError        - business rule violations                    │
//! │  └── ValidationError  - input validation failures                   │
//! │                                                                     │
//! │  tapline-store:  StoreError  - persistence failures                 │
//! │  tapline-engine: EngineError - orchestration (wraps both)           │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → EngineError → operator         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors are enum variants with context, never bare strings.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// A recipe ingredient has no resolved product id. Such a recipe cannot
    /// be sold until the ingredient is re-linked to stock.
    #[error("Recipe '{recipe}' has unresolved ingredient '{ingredient}'")]
    UnresolvedIngredient { recipe: String, ingredient: String },

    /// Not enough stock to sell the requested number of servings.
    /// Surfaces as a disabled purchase, not an exception.
    #[error("Insufficient stock for {name}: {available} servings available, {requested} requested")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Item {0} is not in the cart")]
    ItemNotInCart(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    /// An open tab cannot be discarded; it must go through payment first.
    #[error("Tab '{name}' is still open and cannot be closed without payment")]
    TabStillOpen { name: String },

    /// Items can only be merged into an open tab.
    #[error("Tab '{name}' is already paid and cannot accept more items")]
    TabAlreadyPaid { name: String },

    /// Paying by tab requires an open tab to settle against.
    #[error("Payment method 'tab' requires an open tab")]
    NoTabSelected,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation failures, raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "House Red (Glass (150 ml))".to_string(),
            available: 5,
            requested: 8,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for House Red (Glass (150 ml)): 5 servings available, 8 requested"
        );

        let err = CoreError::TabStillOpen {
            name: "Table 4".to_string(),
        };
        assert!(err.to_string().contains("still open"));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
