//! Intake collaborator: turns inbound bytes into a file jobs can reference.

mod error;
mod fs_intake;
mod traits;

pub use error::IntakeError;
pub use fs_intake::FsIntake;
pub use traits::Intake;
