// pantry/src/workflow/mod.rs

//! A small staged workflow engine.
//!
//! The multi-step order operations (accepting, cancelling, transitioning,
//! delivering, assigning a shipper) are expressed as a [`Workflow`]: an ordered
//! list of named stages, each with `before`/`on`/`after` handlers that operate
//! on a [`SharedContext`]. Handlers return a [`StageControl`] to continue or to
//! stop the run early; any error aborts the run and is returned to the caller.
//!
//! The engine has no notion of persistence. Callers own the transaction that a
//! workflow context carries and decide whether to commit from the
//! [`WorkflowOutcome`].

pub mod context_data;
pub mod control;
pub mod definition;
pub mod error;
pub mod execution;
pub mod stage;

pub use context_data::SharedContext;
pub use control::{StageControl, WorkflowOutcome};
pub use definition::{Handler, Workflow};
pub use error::WorkflowError;
pub use stage::{SkipCondition, StageDef};
