pub mod config;
pub mod gate;
pub mod intake;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod testing;
pub mod transformer;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, StorageConfig,
};
pub use gate::{Admission, ConcurrencyGate, GateError, GateStatus};
pub use intake::{FsIntake, Intake, IntakeError};
pub use job::{
    FailureKind, Job, JobFailure, JobFilter, JobId, JobKind, JobStatus, JobStore, JobWriter,
};
pub use orchestrator::{
    JobOrchestrator, JobRequest, JobUpdateCallback, OrchestratorError, OrchestratorStatus,
    ProcessorConfig,
};
pub use transformer::{ClipRequest, Segment, TransformError, Transformer};
