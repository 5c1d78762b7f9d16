//! Retrain Context
//!
//! This crate contains the run context carried between the states of the
//! retrain pipeline, along with the small value types it holds.
//!
//! A [`RunContext`] is created once per pipeline invocation with only the
//! externally supplied fields populated. Each state mutates the fields it
//! owns and hands the same context to the next state. The context is
//! serializable so it can be supplied as a JSON payload and carried inside
//! checkpoints.

mod context;
mod status;

pub use context::{REQUIRED_FIELDS, RunContext};
pub use status::TrainingJobStatus;
