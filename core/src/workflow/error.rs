// pantry/src/workflow/error.rs
use thiserror::Error;

/// Failures raised by the engine itself rather than by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
  #[error("Handler missing for non-optional stage: {stage}")]
  HandlerMissing { stage: String },

  #[error("Workflow '{workflow}' was stopped by a handler before completing")]
  Halted { workflow: String },
}
