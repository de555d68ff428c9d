//! Job records and the in-memory job ledger.
//!
//! Every job has exactly one [`JobWriter`], handed out by [`JobStore::create`].
//! All status mutations go through it; terminal transitions consume it, so a
//! job cannot change after reaching `Completed` or `Failed`. Readers get
//! cloned [`Job`] snapshots and can wait for completion via
//! [`JobStore::wait_terminal`].

mod store;
mod types;

pub use store::{JobFilter, JobStore, JobWriter};
pub use types::{FailureKind, Job, JobFailure, JobId, JobKind, JobStatus};
