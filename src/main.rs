use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use retrain_blob::FsStore;
use retrain_context::RunContext;
use retrain_dataset::{SeriesIndexing, TransformOptions};
use retrain_params::FileParameterStore;
use retrain_training::InMemoryTrainingService;
use retrain_workflow::{
  Checkpoint, DriverConfig, ProbeFailurePolicy, RunOutcome, Services, WaitMode, WorkflowDriver,
};

/// Retrain - sales forecast model retraining pipeline
#[derive(Parser)]
#[command(name = "retrain")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.retrain)
  #[arg(long, global = true, env = "RETRAIN_DATA_DIR")]
  data_dir: Option<PathBuf>,

  /// Write logs as JSON lines
  #[arg(long, global = true)]
  log_json: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the pipeline from the start
  ///
  /// A JSON object on stdin seeds the run context; flags override it.
  Run {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    driver: DriverArgs,

    /// Write a checkpoint to this file instead of sleeping through training
    #[arg(long)]
    suspend_to: Option<PathBuf>,
  },

  /// Continue a suspended run from its checkpoint file
  Resume {
    /// Checkpoint written by `run --suspend-to`
    checkpoint_file: PathBuf,

    #[command(flatten)]
    driver: DriverArgs,

    /// Overwrite the checkpoint file if the run suspends again
    #[arg(long)]
    suspend: bool,
  },
}

#[derive(Args)]
struct InputArgs {
  /// Bucket holding the raw sales CSV
  #[arg(long, env = "RETRAIN_RESULTS_BUCKET")]
  results_bucket: Option<String>,

  /// Bucket receiving the training data and model artifacts
  #[arg(long, env = "RETRAIN_TRAINING_BUCKET")]
  training_bucket: Option<String>,

  /// Execution role for training and hosting
  #[arg(long, env = "RETRAIN_ROLE")]
  training_role: Option<String>,

  /// Algorithm container image
  #[arg(long, env = "RETRAIN_IMAGE")]
  training_image: Option<String>,

  /// Endpoint to create or update
  #[arg(long, env = "RETRAIN_ENDPOINT_NAME")]
  endpoint_name: Option<String>,

  /// Key of the sales CSV inside the results bucket
  #[arg(long, env = "RETRAIN_SOURCE_CSV")]
  source_csv: Option<String>,

  #[arg(long, env = "RETRAIN_REGION")]
  region: Option<String>,
}

impl InputArgs {
  /// Overwrite context fields with every flag that was given.
  fn apply(self, ctx: &mut RunContext) {
    let overrides = [
      (self.results_bucket, &mut ctx.results_bucket),
      (self.training_bucket, &mut ctx.training_bucket),
      (self.training_role, &mut ctx.training_role),
      (self.training_image, &mut ctx.training_image),
      (self.endpoint_name, &mut ctx.endpoint_name),
      (self.source_csv, &mut ctx.source_csv_path),
      (self.region, &mut ctx.region),
    ];
    for (value, field) in overrides {
      if let Some(value) = value {
        *field = value;
      }
    }
  }
}

#[derive(Args)]
struct DriverArgs {
  /// What to do when the endpoint existence check fails
  #[arg(long, value_enum, default_value_t = ProbeFailureArg::AssumeAbsent)]
  probe_failure: ProbeFailureArg,

  /// How sales rows are grouped into series
  #[arg(long, value_enum, default_value_t = SeriesIndexingArg::Ordinal)]
  series_indexing: SeriesIndexingArg,

  /// Seconds between training status checks
  #[arg(long, default_value_t = 30)]
  poll_interval_secs: u64,

  /// Status checks the local training simulator answers with InProgress
  ///
  /// The simulator lives for one process, so on `resume` this counts the
  /// checks still to come. Use 0 to let a resumed run complete.
  #[arg(long, default_value_t = 0)]
  local_polls: usize,
}

impl DriverArgs {
  fn config(&self, wait_mode: WaitMode) -> DriverConfig {
    DriverConfig {
      poll_interval: Duration::from_secs(self.poll_interval_secs),
      probe_failure: self.probe_failure.into(),
      transform: TransformOptions {
        indexing: self.series_indexing.into(),
        ..TransformOptions::default()
      },
      wait_mode,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum ProbeFailureArg {
  AssumeAbsent,
  Abort,
}

impl From<ProbeFailureArg> for ProbeFailurePolicy {
  fn from(arg: ProbeFailureArg) -> Self {
    match arg {
      ProbeFailureArg::AssumeAbsent => ProbeFailurePolicy::AssumeAbsent,
      ProbeFailureArg::Abort => ProbeFailurePolicy::Abort,
    }
  }
}

#[derive(Clone, Copy, ValueEnum)]
enum SeriesIndexingArg {
  Ordinal,
  Observed,
}

impl From<SeriesIndexingArg> for SeriesIndexing {
  fn from(arg: SeriesIndexingArg) -> Self {
    match arg {
      SeriesIndexingArg::Ordinal => SeriesIndexing::Ordinal,
      SeriesIndexingArg::Observed => SeriesIndexing::Observed,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_json);

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".retrain"),
  };

  match cli.command {
    Some(Commands::Run {
      inputs,
      driver,
      suspend_to,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_pipeline(inputs, driver, suspend_to, data_dir))?;
    }
    Some(Commands::Resume {
      checkpoint_file,
      driver,
      suspend,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(resume_pipeline(checkpoint_file, driver, suspend, data_dir))?;
    }
    None => {
      println!("retrain - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let registry = tracing_subscriber::registry().with(filter);

  if json {
    registry
      .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
      .init();
  } else {
    registry
      .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
      .init();
  }
}

async fn run_pipeline(
  inputs: InputArgs,
  args: DriverArgs,
  suspend_to: Option<PathBuf>,
  data_dir: PathBuf,
) -> Result<()> {
  let mut ctx = read_context_from_stdin()?;
  inputs.apply(&mut ctx);

  let wait_mode = if suspend_to.is_some() {
    WaitMode::Suspend
  } else {
    WaitMode::Sleep
  };
  let training = InMemoryTrainingService::new().with_in_progress_polls(args.local_polls);
  let driver = WorkflowDriver::new(services(&data_dir, training), args.config(wait_mode));

  eprintln!("Data directory: {}", data_dir.display());

  let outcome = driver.run(ctx, cancel_on_ctrl_c()).await?;
  report(outcome, suspend_to.as_deref()).await
}

async fn resume_pipeline(
  checkpoint_file: PathBuf,
  args: DriverArgs,
  suspend: bool,
  data_dir: PathBuf,
) -> Result<()> {
  let content = tokio::fs::read_to_string(&checkpoint_file)
    .await
    .with_context(|| format!("failed to read checkpoint: {}", checkpoint_file.display()))?;
  let checkpoint = Checkpoint::from_json(&content)
    .with_context(|| format!("failed to parse checkpoint: {}", checkpoint_file.display()))?;

  eprintln!(
    "Resuming execution {} at {}",
    checkpoint.execution_id, checkpoint.state
  );

  // The simulator does not outlive a process; re-register the job it was polling.
  let training = InMemoryTrainingService::new()
    .with_in_progress_polls(args.local_polls)
    .with_job(&checkpoint.context.training_job_name);

  let wait_mode = if suspend {
    WaitMode::Suspend
  } else {
    WaitMode::Sleep
  };
  let driver = WorkflowDriver::new(services(&data_dir, training), args.config(wait_mode));

  let outcome = driver.resume(checkpoint, cancel_on_ctrl_c()).await?;
  report(outcome, suspend.then_some(checkpoint_file.as_path())).await
}

fn services(data_dir: &Path, training: InMemoryTrainingService) -> Services {
  Services::new(
    Arc::new(FsStore::new(data_dir.join("blobs"))),
    Arc::new(FileParameterStore::new(data_dir.join("parameters.json"))),
    Arc::new(training),
  )
}

async fn report(outcome: RunOutcome, checkpoint_file: Option<&Path>) -> Result<()> {
  match outcome {
    RunOutcome::Published(result) => {
      eprintln!("Execution completed: {}", result.execution_id);
      eprintln!("States executed: {}", result.history.len());
      println!("{}", serde_json::to_string_pretty(&result.context)?);
    }
    RunOutcome::Suspended(checkpoint) => {
      let path = checkpoint_file.context("run suspended without a checkpoint file")?;
      tokio::fs::write(path, checkpoint.to_json()?)
        .await
        .with_context(|| format!("failed to write checkpoint: {}", path.display()))?;
      eprintln!(
        "Execution {} suspended at {}, checkpoint written to {}",
        checkpoint.execution_id,
        checkpoint.state,
        path.display()
      );
    }
  }
  Ok(())
}

/// A token that is cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Cancelling...");
      trigger.cancel();
    }
  });
  cancel
}

fn read_context_from_stdin() -> Result<RunContext> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, start from an empty context
    Ok(RunContext::new())
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(RunContext::new())
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
