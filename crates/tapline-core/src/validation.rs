//! # Validation Module
//!
//! Input validation for operator-entered data. Everything here runs before
//! persistence: a validation failure has no side effects.

use crate::error::ValidationError;
use crate::types::Recipe;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item or product display name: non-empty, at most 200 chars.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a tab display name ("Table 4", "Dana"): non-empty, at most 80.
pub fn validate_tab_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "tab name".to_string(),
        });
    }

    if name.len() > 80 {
        return Err(ValidationError::TooLong {
            field: "tab name".to_string(),
            max: 80,
        });
    }

    Ok(())
}

/// Reduces a card reference to its last four digits.
///
/// The input may be a full PAN from a swipe or a hand-typed fragment; only
/// the last four digits ever leave this function, so the full number is
/// never persisted anywhere downstream.
pub fn card_last4(reference: &str) -> ValidationResult<String> {
    let digits: Vec<char> = reference.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 4 {
        return Err(ValidationError::InvalidFormat {
            field: "card reference".to_string(),
            reason: "must contain at least four digits".to_string(),
        });
    }

    Ok(digits[digits.len() - 4..].iter().collect())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: positive and within the per-line cap.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is rejected: the catalog never sells
/// free drinks, and a zero price usually means bad import data.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates cart size before inserting a new distinct line.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Recipe Validators
// =============================================================================

/// Checks that a recipe can legally be sold: every ingredient must resolve
/// to a stock product and require a positive amount.
pub fn validate_recipe_sellable(recipe: &Recipe) -> ValidationResult<()> {
    for ingredient in &recipe.ingredients {
        if !ingredient.is_resolved() {
            return Err(ValidationError::InvalidFormat {
                field: "recipe".to_string(),
                reason: format!("ingredient '{}' is not linked to stock", ingredient.product_name),
            });
        }
        if ingredient.quantity <= 0.0 {
            return Err(ValidationError::MustBePositive {
                field: format!("ingredient '{}' quantity", ingredient.product_name),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
