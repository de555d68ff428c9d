//! Transformer collaborator: the component that actually touches media bytes.
//!
//! The orchestrator never builds tool command lines itself. It hands a
//! [`Transformer`] the inputs plus a cancellation token, and implementations
//! are expected to interrupt their external process when the token fires.
//!
//! # Example
//!
//! ```ignore
//! use baggins_core::transformer::{ClipRequest, Segment, Transformer};
//!
//! let request = ClipRequest {
//!     job_id: job_id.clone(),
//!     input_path: PathBuf::from("uploads/talk.mp4"),
//!     segment: Segment::new(30.0, 60.0),
//! };
//!
//! let output = transformer.clip(&request, token).await?;
//! println!("Clipped to {}", output.display());
//! ```

mod error;
mod traits;
mod types;

pub use error::TransformError;
pub use traits::Transformer;
pub use types::{ClipRequest, Segment};
