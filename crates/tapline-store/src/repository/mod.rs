//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Engine code                                                            │
//! │       │                                                                 │
//! │       │  store.products().get(user_id, id)                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                      │
//! │  ├── get / list / upsert / delete                                       │
//! │  └── decrement_stock_cas (guarded write)                                │
//! │       │                                                                 │
//! │       │  SQL, scoped by user_id                                         │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • SQL is isolated in one place                                         │
//! │  • Row structs stay private; callers see domain types only              │
//! │  • Easy to test against an in-memory database                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Stock CRUD and guarded quantity writes
//! - [`recipe::RecipeRepository`] - Recipe CRUD
//! - [`tab::TabRepository`] - Tab lifecycle with status-guarded transitions
//! - [`sale::SaleRepository`] - Append-only sale records
//! - [`audit::AuditRepository`] - Append-only inventory log

pub mod audit;
pub mod product;
pub mod recipe;
pub mod sale;
pub mod tab;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// Parses a JSON document column into its domain type.
pub(crate) fn parse_json<T: DeserializeOwned>(
    entity: &str,
    id: &str,
    raw: &str,
) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| StoreError::corrupt(entity, id, &e))
}

/// Parses a bare keyword column ("wine", "sale_depletion") into an enum
/// that serializes as a JSON string.
pub(crate) fn parse_keyword<T: DeserializeOwned>(
    entity: &str,
    id: &str,
    raw: &str,
) -> StoreResult<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string()))
        .map_err(|e| StoreError::corrupt(entity, id, &e))
}

/// Renders an enum that serializes as a JSON string into its bare keyword
/// for storage in a TEXT column.
pub(crate) fn keyword<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}

/// Serializes a domain value into a JSON document column.
pub(crate) fn to_json<T: Serialize>(entity: &str, id: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| StoreError::corrupt(entity, id, &e))
}
