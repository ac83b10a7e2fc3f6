//! # tapline-core: Pure Business Logic for Tapline
//!
//! This crate is the **heart** of Tapline. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tapline Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tapline-engine (Orchestration)               │   │
//! │  │   CheckoutService ─► TabLedger ─► DepletionEngine ─► Alerts     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tapline-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │   tax    │ │ catalog  │ │   cart   │ │   availability   │  │   │
//! │  │   │  rules   │ │  pours   │ │   tab    │ │     report       │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK DEPENDENCE IN MATH           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tapline-store (Persistence)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Recipe, Sale, audit records)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`units`] - Volume units and bottle-size defaults
//! - [`tax`] - Jurisdiction tax rules with exact compound rounding
//! - [`catalog`] - By-the-glass serving formats derived from bottle stock
//! - [`availability`] - Servings-available math over recipe ingredients
//! - [`cart`] - Cart state machine and totals
//! - [`tab`] - Tab state machine (open → paid → removed)
//! - [`report`] - Sales aggregation and CSV export
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every pricing function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tapline_core::money::Money;
//! use tapline_core::tax::{self, TaxConfig, TaxRate};
//!
//! // Create money from cents (never from floats!)
//! let subtotal = Money::from_cents(10_000); // $100.00
//!
//! // Compute a compound two-component breakdown for Quebec.
//! let config = TaxConfig::new("QC", TaxRate::from_milli_percent(13_000));
//! let breakdown = tax::compute(subtotal, &config);
//!
//! assert_eq!(breakdown.primary_cents, 500);    // GST 5%
//! assert_eq!(breakdown.secondary_cents, 1047); // QST 9.975% on subtotal+GST
//! assert_eq!(breakdown.total_cents, 1547);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod availability;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod money;
pub mod report;
pub mod tab;
pub mod tax;
pub mod types;
pub mod units;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tapline_core::Money` instead of
// `use tapline_core::money::Money`

pub use cart::{Cart, CartItem, CartSource, CartTotals, PaymentMethod, Tip};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tab::{Tab, TabStatus};
pub use tax::{TaxBreakdown, TaxConfig, TaxRate};
pub use types::*;
pub use units::Unit;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line in a cart
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
