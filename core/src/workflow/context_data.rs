// pantry/src/workflow/context_data.rs

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Shared, lockable workflow state handed to every stage handler.
///
/// Guards are blocking `parking_lot` guards and MUST be dropped before any
/// `.await` point. Copy what the handler needs out of the guard, await, then
/// take a fresh guard to write results back.
#[derive(Debug)]
pub struct SharedContext<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> SharedContext<T> {
  pub fn new(data: T) -> Self {
    SharedContext(Arc::new(RwLock::new(data)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Read guard narrowed to one field, e.g. `ctx.map_read(|c| &c.order_id)`.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }

  /// Consumes the context and returns the inner data if this is the last handle.
  pub fn try_into_inner(self) -> Result<T, Self> {
    Arc::try_unwrap(self.0).map(RwLock::into_inner).map_err(SharedContext)
  }
}

impl<T: Send + Sync + 'static> Clone for SharedContext<T> {
  fn clone(&self) -> Self {
    SharedContext(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for SharedContext<T> {
  fn default() -> Self {
    Self::new(Default::default())
  }
}
