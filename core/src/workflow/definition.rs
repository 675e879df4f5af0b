// pantry/src/workflow/definition.rs

//! The `Workflow<TData, Err>` struct, its construction and handler registration.

use super::context_data::SharedContext;
use super::control::StageControl;
use super::error::WorkflowError;
use super::stage::{SkipCondition, StageDef};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// A boxed async stage handler.
///
/// Takes a clone of the shared context and resolves to the control signal or
/// the workflow's error type.
pub type Handler<TData, Err> = Box<
  dyn Fn(SharedContext<TData>) -> Pin<Box<dyn Future<Output = Result<StageControl, Err>> + Send>>
    + Send
    + Sync,
>;

/// An ordered set of named stages over a context `TData`, whose handlers fail with `Err`.
pub struct Workflow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) stages: Vec<StageDef<TData>>,
  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Workflow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<WorkflowError> + Send + Sync + 'static,
{
  /// Creates a workflow from `(stage_name, optional, skip_if)` triples.
  pub fn new(name: &str, stage_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> Self {
    let stages = stage_defs
      .iter()
      .map(|(stage, optional, skip_if)| StageDef {
        name: (*stage).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name: name.to_string(),
      stages,
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn stage_names(&self) -> impl Iterator<Item = &str> {
    self.stages.iter().map(|s| s.name.as_str())
  }

  /// Panics on an unknown stage name: that is a wiring mistake, not a runtime condition.
  fn ensure_stage_exists(&self, stage: &str) {
    if !self.stages.iter().any(|s| s.name == stage) {
      panic!("Workflow '{}' has no stage named '{}'", self.name, stage);
    }
  }

  fn wrap<F, UserErr>(handler_fn: impl Fn(SharedContext<TData>) -> F + Send + Sync + 'static) -> Handler<TData, Err>
  where
    F: Future<Output = Result<StageControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    Box::new(move |ctx| {
      let fut = handler_fn(ctx);
      Box::pin(async move { fut.await.map_err(Into::into) })
    })
  }

  pub fn before<F, UserErr>(&mut self, stage: &str, handler_fn: impl Fn(SharedContext<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_stage_exists(stage);
    self.before.entry(stage.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  pub fn on<F, UserErr>(&mut self, stage: &str, handler_fn: impl Fn(SharedContext<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_stage_exists(stage);
    self.on.entry(stage.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  pub fn after<F, UserErr>(&mut self, stage: &str, handler_fn: impl Fn(SharedContext<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = Result<StageControl, UserErr>> + Send + 'static,
    UserErr: Into<Err> + Send + Sync + 'static,
  {
    self.ensure_stage_exists(stage);
    self.after.entry(stage.to_string()).or_default().push(Self::wrap(handler_fn));
  }

  /// Appends a stage at the end. Panics if the name is taken.
  pub fn push_stage(&mut self, stage: &str, optional: bool, skip_if: Option<SkipCondition<TData>>) {
    if self.stages.iter().any(|s| s.name == stage) {
      panic!("Workflow '{}' already has a stage named '{}'", self.name, stage);
    }
    self.stages.push(StageDef {
      name: stage.to_string(),
      optional,
      skip_if,
    });
  }
}
