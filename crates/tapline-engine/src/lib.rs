//! # tapline-engine: Order Orchestration for Tapline
//!
//! The layer the POS surface calls into. Owns every flow that touches more
//! than one subsystem.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   ★ tapline-engine (THIS CRATE) ★                       │
//! │                                                                         │
//! │   ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                  │
//! │   │  checkout    │  │    tabs      │  │  depletion   │                  │
//! │   │ validate →   │  │ open/merge/  │  │ plan → CAS   │                  │
//! │   │ sale → stock │  │ settle/close │  │ retry → log  │                  │
//! │   └──────┬───────┘  └──────┬───────┘  └──────┬───────┘                  │
//! │          │                 │                 │                          │
//! │   ┌──────┴───────┐  ┌──────┴───────┐  ┌──────┴───────┐                  │
//! │   │    audit     │  │    alerts    │  │    error     │                  │
//! │   │ trail + scan │  │ mpsc queue   │  │ Core | Store │                  │
//! │   └──────────────┘  └──────────────┘  └──────────────┘                  │
//! │                                                                         │
//! │   pure rules:  tapline-core      persistence:  tapline-store            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`checkout`] - Immediate sale path: validate, re-check, persist, deplete
//! - [`tabs`] - Tab ledger: open, merge, idempotent settle, close
//! - [`depletion`] - Guarded stock decrements with bounded CAS retry
//! - [`alerts`] - Fire-and-forget stock alert queue
//! - [`audit`] - Best-effort audit writer and suspicion heuristics
//! - [`error`] - Engine error type wrapping core and store errors

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod audit;
pub mod checkout;
pub mod depletion;
pub mod error;
pub mod tabs;

// =============================================================================
// Re-exports
// =============================================================================

pub use alerts::{AlertKind, AlertQueue, AlertSink, StockAlert, TracingAlertSink};
pub use audit::{scan_for_suspicious, AuditTrail, SuspicionFlag, SuspicionKind};
pub use checkout::CheckoutService;
pub use depletion::{depletion_plan, DepletionEngine, DepletionReport};
pub use error::{EngineError, EngineResult};
pub use tabs::{Settlement, TabLedger};
