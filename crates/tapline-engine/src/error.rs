//! # Engine Error Types
//!
//! The engine sits between the pure core and the store, so its error type
//! wraps both. The one engine-specific failure is `DepletionRetriesExhausted`:
//! the guarded stock write lost the race too many times in a row.

use thiserror::Error;

use tapline_core::CoreError;
use tapline_store::StoreError;

/// Orchestration errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A business rule rejected the operation. Nothing was persisted.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The guarded stock write kept losing to concurrent writers.
    #[error("Stock write for {product} conflicted {attempts} times; giving up")]
    DepletionRetriesExhausted { product: String, attempts: u32 },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
