//! Beyond submission pipeline
//!
//! Orchestrates the network side of a content submission (asset pre-upload,
//! metadata request, token refresh, orphan cleanup) and exposes the outcome as a
//! state machine the presentation layer can subscribe to.

pub mod orchestrator;
pub mod progress;
pub mod session;
pub mod state;

pub use orchestrator::{ImageStrategy, Orchestrator};
pub use progress::{percent_of, PercentTracker};
pub use session::SubmissionSession;
pub use state::{AttemptId, SubmissionMachine, SubmissionState, TransitionError};
