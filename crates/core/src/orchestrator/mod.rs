//! Job orchestrator: creates jobs, runs them under the concurrency gate and
//! records their outcome.
//!
//! - **Extract**: one admitted clip operation.
//! - **Download**: admitted fetch, then an optional chained extract job.
//! - **YouTube extract**: admitted audio fetch, then an optional chained extract job.
//!
//! A job holds its gate slot only while the transformer is working; parents
//! never keep a slot while awaiting a chained child.

mod config;
mod runner;
mod types;

pub use config::ProcessorConfig;
pub use runner::{JobOrchestrator, JobUpdateCallback};
pub use types::{JobRequest, OrchestratorError, OrchestratorStatus};
