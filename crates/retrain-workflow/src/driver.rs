//! The driver loop.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use retrain_context::RunContext;
use retrain_dataset::TransformOptions;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::checkpoint::{Checkpoint, RunOutcome, RunResult};
use crate::error::{RunFailure, WorkflowError};
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::state::State;
use crate::steps::publish::ProbeFailurePolicy;
use crate::steps::{Services, defaults, poll, publish, submit, transform, validate};

/// How the driver handles `WaitForTraining`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
  /// Sleep in-process for the poll interval.
  #[default]
  Sleep,
  /// Return a checkpoint and let the host resume later.
  Suspend,
}

/// Driver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
  /// Time between training status checks.
  pub poll_interval: Duration,
  pub probe_failure: ProbeFailurePolicy,
  pub transform: TransformOptions,
  pub wait_mode: WaitMode,
}

impl Default for DriverConfig {
  fn default() -> Self {
    Self {
      poll_interval: poll::POLL_INTERVAL,
      probe_failure: ProbeFailurePolicy::default(),
      transform: TransformOptions::default(),
      wait_mode: WaitMode::default(),
    }
  }
}

/// Runs the retrain pipeline.
///
/// States execute strictly one after another against a single
/// [`RunContext`]. Cancellation is checked between states and during the
/// training wait, never in the middle of a service call.
///
/// # Usage
///
/// ```ignore
/// let driver = WorkflowDriver::new(services, DriverConfig::default());
/// match driver.run(RunContext::new(), CancellationToken::new()).await? {
///   RunOutcome::Published(result) => println!("{:?}", result.context.endpoint_arn),
///   RunOutcome::Suspended(checkpoint) => save(checkpoint),
/// }
/// ```
pub struct WorkflowDriver<N: ExecutionNotifier = NoopNotifier> {
  services: Services,
  config: DriverConfig,
  notifier: N,
}

impl WorkflowDriver<NoopNotifier> {
  pub fn new(services: Services, config: DriverConfig) -> Self {
    Self {
      services,
      config,
      notifier: NoopNotifier,
    }
  }
}

impl<N: ExecutionNotifier> WorkflowDriver<N> {
  /// Replace the notifier that receives execution events.
  pub fn with_notifier<M: ExecutionNotifier>(self, notifier: M) -> WorkflowDriver<M> {
    WorkflowDriver {
      services: self.services,
      config: self.config,
      notifier,
    }
  }

  pub fn config(&self) -> &DriverConfig {
    &self.config
  }

  /// Run a new pipeline from the first state.
  pub async fn run(
    &self,
    ctx: RunContext,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunFailure> {
    let execution_id = uuid::Uuid::new_v4().to_string();
    self
      .drive(execution_id, State::START, ctx, Vec::new(), cancel)
      .await
  }

  /// Continue a suspended run.
  ///
  /// Waits out whatever is left of the checkpoint's delay first.
  pub async fn resume(
    &self,
    checkpoint: Checkpoint,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunFailure> {
    let delay = checkpoint.remaining(Utc::now());
    if !delay.is_zero() {
      info!(
        execution_id = %checkpoint.execution_id,
        delay_secs = delay.as_secs(),
        "waiting before resume"
      );
      if let Err(e) = poll::wait_for_training(delay, &cancel).await {
        return Err(self.fail(
          &checkpoint.execution_id,
          checkpoint.state,
          checkpoint.context,
          e,
        ));
      }
    }

    self
      .drive(
        checkpoint.execution_id,
        checkpoint.state,
        checkpoint.context,
        checkpoint.history,
        cancel,
      )
      .await
  }

  /// Run the handler for `state` and return the state that follows it.
  pub async fn step(
    &self,
    state: State,
    ctx: &mut RunContext,
    cancel: &CancellationToken,
  ) -> Result<State, WorkflowError> {
    let training = self.services.training.as_ref();

    match state {
      State::SetDefaults => {
        defaults::apply_defaults(self.services.parameters.as_ref(), ctx).await?
      }
      State::Validate => validate::validate(ctx)?,
      State::TransformData => {
        transform::transform_data(self.services.blobs.as_ref(), &self.config.transform, ctx).await?
      }
      State::SubmitTrainingJob => submit::submit_training_job(training, ctx).await?,
      State::CheckTrainingStatus => poll::check_training_status(training, ctx).await?,
      State::WaitForTraining => poll::wait_for_training(self.config.poll_interval, cancel).await?,
      State::RegisterModel => publish::register_model(training, ctx).await?,
      State::CreateEndpointConfig => publish::create_endpoint_config(training, ctx).await?,
      State::ProbeEndpoint => {
        publish::check_endpoint(training, self.config.probe_failure, ctx).await?
      }
      State::CreateEndpoint => publish::create_endpoint(training, ctx).await?,
      State::UpdateEndpoint => publish::update_endpoint(training, ctx).await?,
      State::Done => {}
    }

    state.next(ctx)
  }

  #[instrument(name = "pipeline_run", skip_all, fields(execution_id = %execution_id, start = %state))]
  async fn drive(
    &self,
    execution_id: String,
    mut state: State,
    mut ctx: RunContext,
    mut history: Vec<State>,
    cancel: CancellationToken,
  ) -> Result<RunOutcome, RunFailure> {
    info!(execution_id = %execution_id, state = %state, "pipeline_started");
    self.notifier.notify(ExecutionEvent::PipelineStarted {
      execution_id: execution_id.clone(),
      state,
    });

    loop {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, state = %state, "pipeline cancelled");
        return Err(self.fail(&execution_id, state, ctx, WorkflowError::Cancelled));
      }

      if state.is_terminal() {
        info!(
          execution_id = %execution_id,
          endpoint_arn = ?ctx.endpoint_arn,
          "pipeline_completed"
        );
        self.notifier.notify(ExecutionEvent::PipelineCompleted {
          execution_id: execution_id.clone(),
          endpoint_arn: ctx.endpoint_arn.clone(),
        });
        return Ok(RunOutcome::Published(RunResult {
          execution_id,
          context: ctx,
          history,
        }));
      }

      if state == State::WaitForTraining && self.config.wait_mode == WaitMode::Suspend {
        // The host waits out this state before resuming.
        history.push(state);
        return Ok(RunOutcome::Suspended(self.suspend(execution_id, ctx, history)));
      }

      info!(execution_id = %execution_id, state = %state, "state_started");
      self.notifier.notify(ExecutionEvent::StateStarted {
        execution_id: execution_id.clone(),
        state,
      });

      match self.step(state, &mut ctx, &cancel).await {
        Ok(next) => {
          info!(
            execution_id = %execution_id,
            state = %state,
            next = %next,
            "state_completed"
          );
          self.notifier.notify(ExecutionEvent::StateCompleted {
            execution_id: execution_id.clone(),
            state,
            next,
          });
          history.push(state);
          state = next;
        }
        Err(e) => {
          error!(
            execution_id = %execution_id,
            state = %state,
            error = %e.report(),
            "state_failed"
          );
          self.notifier.notify(ExecutionEvent::StateFailed {
            execution_id: execution_id.clone(),
            state,
            error: e.report(),
          });
          return Err(self.fail(&execution_id, state, ctx, e));
        }
      }
    }
  }

  /// Hand back a checkpoint that polls again once the interval has passed.
  fn suspend(&self, execution_id: String, ctx: RunContext, history: Vec<State>) -> Checkpoint {
    let resume_after = TimeDelta::from_std(self.config.poll_interval)
      .ok()
      .and_then(|interval| Utc::now().checked_add_signed(interval))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);

    info!(
      execution_id = %execution_id,
      resume_after = %resume_after,
      "pipeline_suspended"
    );
    self.notifier.notify(ExecutionEvent::PipelineSuspended {
      execution_id: execution_id.clone(),
      state: State::CheckTrainingStatus,
      resume_after,
    });

    Checkpoint {
      execution_id,
      state: State::CheckTrainingStatus,
      context: ctx,
      resume_after: Some(resume_after),
      history,
    }
  }

  fn fail(
    &self,
    execution_id: &str,
    state: State,
    ctx: RunContext,
    source: WorkflowError,
  ) -> RunFailure {
    error!(
      execution_id = %execution_id,
      state = %state,
      error = %source.report(),
      "pipeline_failed"
    );
    self.notifier.notify(ExecutionEvent::PipelineFailed {
      execution_id: execution_id.to_string(),
      state,
      error: source.report(),
    });

    RunFailure {
      execution_id: execution_id.to_string(),
      state,
      context: Box::new(ctx),
      source,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use retrain_blob::MemoryStore;
  use retrain_params::InMemoryParameterStore;
  use retrain_training::InMemoryTrainingService;

  use super::*;

  fn driver() -> WorkflowDriver {
    let services = Services::new(
      Arc::new(MemoryStore::new()),
      Arc::new(InMemoryParameterStore::new()),
      Arc::new(InMemoryTrainingService::new()),
    );
    WorkflowDriver::new(services, DriverConfig::default())
  }

  #[test]
  fn test_default_config() {
    let config = DriverConfig::default();
    assert_eq!(config.poll_interval, Duration::from_secs(30));
    assert_eq!(config.probe_failure, ProbeFailurePolicy::AssumeAbsent);
    assert_eq!(config.wait_mode, WaitMode::Sleep);
  }

  #[tokio::test]
  async fn test_done_is_absorbing() {
    let mut ctx = RunContext::new();
    let next = driver()
      .step(State::Done, &mut ctx, &CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(next, State::Done);
  }

  #[tokio::test]
  async fn test_cancelled_before_first_state() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = driver().run(RunContext::new(), cancel).await.unwrap_err();

    assert_eq!(failure.state, State::SetDefaults);
    assert!(matches!(failure.source, WorkflowError::Cancelled));
  }

  #[tokio::test]
  async fn test_failure_reports_state_and_context() {
    // The parameter store is empty, so defaults cannot be applied.
    let failure = driver().run(RunContext::new(), CancellationToken::new()).await.unwrap_err();

    assert_eq!(failure.state, State::SetDefaults);
    assert!(matches!(failure.source, WorkflowError::Parameters(_)));
    assert_eq!(*failure.context, RunContext::new());
  }
}
