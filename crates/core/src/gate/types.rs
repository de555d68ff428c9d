//! Types for the concurrency gate.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Reasons admission can fail. Nothing is registered when it does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// No slot became free before the deadline.
    #[error("no worker slot available within {}s", waited.as_secs())]
    DeadlineExceeded { waited: Duration },

    /// The parent scope was cancelled while waiting.
    #[error("admission cancelled")]
    Cancelled,

    /// The gate was closed.
    #[error("gate is closed")]
    Closed,
}

/// Snapshot of the gate's occupancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateStatus {
    /// Maximum concurrent operations.
    pub capacity: usize,
    /// Slots currently held.
    pub active: usize,
    /// Callers waiting for a slot.
    pub waiting: usize,
    /// Total admissions since startup.
    pub total_admitted: u64,
    /// Total admissions that hit their deadline.
    pub total_timed_out: u64,
    /// Total explicit cancellations of admitted jobs.
    pub total_cancelled: u64,
}
