//! # tapline-store: Persistence Layer for Tapline
//!
//! This crate provides database access for Tapline. It uses SQLite for
//! local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tapline Data Flow                                │
//! │                                                                         │
//! │  tapline-engine (CheckoutService, TabLedger, DepletionEngine)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tapline-store (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │     Store     │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ product/tab/  │    │  (embedded)  │  │   │
//! │  │   │               │    │ recipe/sale/  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ audit         │    │ 0001_init    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode), keyed by (user_id, id)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types
//! - [`repository`] - Repository implementations per entity
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tapline_store::{Store, StoreConfig};
//!
//! let store = Store::new(StoreConfig::new("path/to/tapline.db")).await?;
//! let products = store.products().list(user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{StoreError, StoreResult};
pub use pool::{Store, StoreConfig};

// Repository re-exports for convenience
pub use repository::audit::AuditRepository;
pub use repository::product::ProductRepository;
pub use repository::recipe::RecipeRepository;
pub use repository::sale::SaleRepository;
pub use repository::tab::{SettleOutcome, TabRepository};
