// pantry/src/workflow/stage.rs

use super::SharedContext;
use std::sync::Arc;

/// Predicate evaluated right before a stage runs. `true` skips the stage.
pub type SkipCondition<T> = Arc<dyn Fn(SharedContext<T>) -> bool + Send + Sync + 'static>;

/// A named stage within a workflow.
#[derive(Clone)]
pub struct StageDef<T: 'static + Send + Sync> {
  pub name: String,
  /// An optional stage without handlers is silently skipped instead of failing the run.
  pub optional: bool,
  pub skip_if: Option<SkipCondition<T>>,
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StageDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StageDef")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}
