// pantry/src/store/shared.rs

use super::{Store, StoreError, StoreTx};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// A [`StoreTx`] that several workflow stages can reach through their context.
///
/// Dropping the last clone without [`SharedTx::commit`] rolls the transaction back.
#[derive(Clone)]
pub struct SharedTx(Arc<Mutex<Box<dyn StoreTx>>>);

impl SharedTx {
  pub async fn begin(store: &dyn Store) -> Result<Self, StoreError> {
    let tx = store.begin().await?;
    Ok(Self(Arc::new(Mutex::new(tx))))
  }

  pub async fn lock(&self) -> MutexGuard<'_, Box<dyn StoreTx>> {
    self.0.lock().await
  }

  pub async fn commit(&self) -> Result<(), StoreError> {
    self.0.lock().await.commit().await
  }
}

impl std::fmt::Debug for SharedTx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("SharedTx")
  }
}
