//! # Stock Alert Queue
//!
//! Fire-and-forget delivery of low-stock and out-of-stock signals.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DepletionEngine ──publish()──► mpsc (unbounded) ──► background task    │
//! │       │                                                   │             │
//! │       │ never blocks,                                     ▼             │
//! │       │ never errors                              AlertSink::deliver    │
//! │       ▼                                             │           │       │
//! │  sale completes                                  Ok: delivered++        │
//! │                                                  Err: failed++, warn!   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed delivery is counted and logged, nothing more. The sale that
//! produced the alert is already committed by the time the alert exists.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

// =============================================================================
// Alerts
// =============================================================================

/// Severity of a stock alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    OutOfStock,
}

/// One stock signal raised after depletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockAlert {
    pub kind: AlertKind,
    pub product_id: String,
    pub product_name: String,
    /// Quantity after the decrement that raised the alert.
    pub quantity: i64,
    /// Threshold the quantity fell to or below (out-of-stock: 0).
    pub threshold: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sink
// =============================================================================

/// Where alerts end up: a notification service, a dashboard, a log.
///
/// Delivery failures are reported back as strings; the queue counts and
/// logs them without retrying.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &StockAlert) -> Result<(), String>;
}

/// Default sink: structured log output.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn deliver(&self, alert: &StockAlert) -> Result<(), String> {
        warn!(
            kind = ?alert.kind,
            product_id = %alert.product_id,
            product = %alert.product_name,
            quantity = alert.quantity,
            threshold = alert.threshold,
            "Stock alert"
        );
        Ok(())
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Asynchronous alert dispatcher.
///
/// Publishing never blocks and never fails the caller: the alert goes onto
/// an unbounded channel and a background task drives the sink.
pub struct AlertQueue {
    tx: mpsc::UnboundedSender<StockAlert>,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    worker: tokio::task::JoinHandle<()>,
}

impl AlertQueue {
    /// Spawns the queue with the given sink.
    pub fn new(sink: Arc<dyn AlertSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StockAlert>();
        let delivered = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        let delivered_task = Arc::clone(&delivered);
        let failed_task = Arc::clone(&failed);
        let worker = tokio::spawn(async move {
            while let Some(alert) = rx.recv().await {
                match sink.deliver(&alert) {
                    Ok(()) => {
                        delivered_task.fetch_add(1, Ordering::Relaxed);
                        debug!(product_id = %alert.product_id, "Alert delivered");
                    }
                    Err(reason) => {
                        failed_task.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            product_id = %alert.product_id,
                            reason = %reason,
                            "Alert delivery failed"
                        );
                    }
                }
            }
        });

        AlertQueue {
            tx,
            delivered,
            failed,
            worker,
        }
    }

    /// Enqueues an alert. Never blocks; a closed queue counts as a failed
    /// delivery.
    pub fn publish(&self, alert: StockAlert) {
        if self.tx.send(alert).is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            warn!("Alert queue closed; alert dropped");
        }
    }

    /// Number of alerts delivered to the sink.
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Number of alerts that could not be delivered.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Closes the queue and waits for queued alerts to drain.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Alert worker did not shut down cleanly");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
