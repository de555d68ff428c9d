//! Bounded admission for heavy transformation work.
//!
//! The [`ConcurrencyGate`] caps how many operations run at once and keeps a
//! cancellation token per admitted job, so a single named job can be aborted.
//!
//! # Example
//!
//! ```ignore
//! use baggins_core::gate::ConcurrencyGate;
//! use tokio_util::sync::CancellationToken;
//!
//! let gate = ConcurrencyGate::new(5);
//! let root = CancellationToken::new();
//!
//! let admission = gate.admit(&job_id, &root, Duration::from_secs(300)).await?;
//! transformer.clip(&request, admission.token().clone()).await?;
//! admission.release();
//! ```

mod admission;
mod types;

pub use admission::{Admission, ConcurrencyGate};
pub use types::{GateError, GateStatus};
