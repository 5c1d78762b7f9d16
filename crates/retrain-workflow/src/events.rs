//! Pipeline events and notifiers.
//!
//! The driver emits an event at every state boundary so hosts can follow a
//! run, persist its progress or stream it elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::state::State;

/// Events emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  /// A run started, or resumed, at `state`.
  PipelineStarted { execution_id: String, state: State },

  StateStarted { execution_id: String, state: State },

  /// A state finished and the pipeline moves to `next`.
  StateCompleted {
    execution_id: String,
    state: State,
    next: State,
  },

  StateFailed {
    execution_id: String,
    state: State,
    error: String,
  },

  /// The endpoint now serves the newly trained model.
  PipelineCompleted {
    execution_id: String,
    endpoint_arn: Option<String>,
  },

  /// The run handed back a checkpoint instead of waiting in-process.
  PipelineSuspended {
    execution_id: String,
    state: State,
    resume_after: DateTime<Utc>,
  },

  PipelineFailed {
    execution_id: String,
    state: State,
    error: String,
  },
}

/// Receives execution events.
///
/// The driver calls `notify` synchronously at each state boundary, so
/// implementations should hand events off rather than block.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Sends events to an unbounded channel.
///
/// A run emits a handful of events per state, so the channel stays small
/// even with a slow consumer.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
