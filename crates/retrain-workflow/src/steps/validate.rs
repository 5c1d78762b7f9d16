use retrain_context::RunContext;

use crate::error::WorkflowError;

/// Reject the run if any required input is still empty.
///
/// Every missing field is reported, not just the first.
pub fn validate(ctx: &RunContext) -> Result<(), WorkflowError> {
  let fields = ctx.missing_required();
  if fields.is_empty() {
    Ok(())
  } else {
    Err(WorkflowError::MissingFields { fields })
  }
}
