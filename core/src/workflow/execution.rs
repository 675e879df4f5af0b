// pantry/src/workflow/execution.rs

//! `Workflow::run`, executing stages and their handlers in order.

use super::context_data::SharedContext;
use super::control::{StageControl, WorkflowOutcome};
use super::definition::{Handler, Workflow};
use super::error::WorkflowError;
use tracing::{event, instrument, span, Instrument, Level};

enum Phase {
  Proceed,
  Halt,
}

impl<TData, Err> Workflow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  /// Runs every stage against `ctx`.
  ///
  /// Returns `Stopped` as soon as a handler asks to stop, and the first
  /// handler error unchanged.
  #[instrument(
    name = "Workflow::run",
    skip_all,
    fields(workflow = %self.name, num_stages = self.stages.len()),
    err(Display)
  )]
  pub async fn run(&self, ctx: SharedContext<TData>) -> Result<WorkflowOutcome, Err> {
    event!(Level::DEBUG, "Workflow starting.");

    for (idx, stage) in self.stages.iter().enumerate() {
      let stage_span = span!(Level::INFO, "workflow_stage", stage = %stage.name, index = idx);

      if let Some(skip_if) = &stage.skip_if {
        if skip_if(ctx.clone()) {
          event!(parent: &stage_span, Level::DEBUG, "Stage skipped by condition.");
          continue;
        }
      }

      let before = self.before.get(&stage.name).filter(|v| !v.is_empty());
      let on = self.on.get(&stage.name).filter(|v| !v.is_empty());
      let after = self.after.get(&stage.name).filter(|v| !v.is_empty());

      if before.is_none() && on.is_none() && after.is_none() {
        if stage.optional {
          event!(parent: &stage_span, Level::DEBUG, "Optional stage has no handlers, skipping.");
          continue;
        }
        event!(parent: &stage_span, Level::ERROR, "Non-optional stage has no handlers.");
        return Err(Err::from(WorkflowError::HandlerMissing {
          stage: stage.name.clone(),
        }));
      }

      for (phase, handlers) in [("before", before), ("on", on), ("after", after)] {
        let Some(handlers) = handlers else { continue };
        let outcome = run_phase(handlers, &ctx, phase).instrument(stage_span.clone()).await?;
        if let Phase::Halt = outcome {
          event!(parent: &stage_span, Level::INFO, phase, "Workflow stopped by a handler.");
          return Ok(WorkflowOutcome::Stopped);
        }
      }
    }

    event!(Level::DEBUG, "Workflow completed.");
    Ok(WorkflowOutcome::Completed)
  }
}

async fn run_phase<TData, Err>(
  handlers: &[Handler<TData, Err>],
  ctx: &SharedContext<TData>,
  phase: &'static str,
) -> Result<Phase, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in handlers {
    match handler(ctx.clone()).await {
      Ok(StageControl::Continue) => {}
      Ok(StageControl::Stop) => return Ok(Phase::Halt),
      Err(e) => {
        event!(Level::WARN, phase, error = %e, "Stage handler failed.");
        return Err(e);
      }
    }
  }
  Ok(Phase::Proceed)
}
