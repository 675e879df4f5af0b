// pantry/src/workflow/control.rs

//! Signals for controlling workflow flow and the outcome of a run.

/// Returned by a handler to say whether the workflow should carry on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageControl {
  /// Run the remaining handlers of this stage and the following stages.
  Continue,
  /// Halt immediately. No further handlers run.
  Stop,
}

/// Outcome of a full workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
  /// Every non-skipped stage ran.
  Completed,
  /// A handler returned [`StageControl::Stop`].
  Stopped,
}

impl WorkflowOutcome {
  pub fn is_completed(self) -> bool {
    matches!(self, WorkflowOutcome::Completed)
  }
}
