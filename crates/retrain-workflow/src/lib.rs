//! Retrain Workflow
//!
//! The sales forecast retrain pipeline as an explicit state machine:
//!
//! ```text
//! SetDefaults -> Validate -> TransformData -> SubmitTrainingJob
//!   -> CheckTrainingStatus <-> WaitForTraining
//!   -> RegisterModel -> CreateEndpointConfig -> ProbeEndpoint
//!   -> CreateEndpoint | UpdateEndpoint -> Done
//! ```
//!
//! Each [`State`] maps to one handler in [`steps`]; [`State::next`] is the
//! transition table. The [`WorkflowDriver`] walks the states against a single
//! [`RunContext`](retrain_context::RunContext), emits [`ExecutionEvent`]s and
//! either sleeps through training waits or hands back a [`Checkpoint`] that
//! a later process can resume.
//!
//! Nothing is retried inside the pipeline. A failing state stops the run and
//! is reported as a [`RunFailure`] naming that state.

mod checkpoint;
mod driver;
mod error;
mod events;
mod state;
pub mod steps;

pub use checkpoint::{Checkpoint, RunOutcome, RunResult};
pub use driver::{DriverConfig, WaitMode, WorkflowDriver};
pub use error::{RunFailure, WorkflowError};
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use state::{State, next_after_probe, next_after_status};
pub use steps::Services;
pub use steps::publish::{ProbeFailurePolicy, ProbeOutcome};
