// pantry/src/shipment/timers.rs

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

type TimerKey = (String, String);

struct Armed {
  token: CancellationToken,
  generation: u64,
}

/// Cancellable delayed tasks keyed by `(order_id, shipper_id)`.
///
/// Scheduling a key that is already armed cancels the earlier task. A task that
/// fires removes its own entry before running its action.
#[derive(Clone, Default)]
pub struct AssignmentTimers {
  armed: Arc<Mutex<HashMap<TimerKey, Armed>>>,
  generations: Arc<AtomicU64>,
}

impl AssignmentTimers {
  pub fn new() -> Self {
    Self::default()
  }

  /// Runs `on_expiry` after `delay` unless the key is defused or rescheduled first.
  pub fn schedule<F>(&self, order_id: &str, shipper_id: &str, delay: Duration, on_expiry: F)
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let key = (order_id.to_string(), shipper_id.to_string());
    let token = CancellationToken::new();
    let generation = self.generations.fetch_add(1, Ordering::Relaxed);

    let previous = self.armed.lock().insert(
      key.clone(),
      Armed {
        token: token.clone(),
        generation,
      },
    );
    if let Some(previous) = previous {
      previous.token.cancel();
    }

    let timers = self.clone();
    let span = tracing::debug_span!("assignment_timer", order_id, shipper_id, delay_secs = delay.as_secs());
    tokio::spawn(
      async move {
        tokio::select! {
          _ = token.cancelled() => {
            debug!("Assignment timer defused.");
          }
          _ = tokio::time::sleep(delay) => {
            timers.forget(&key, generation);
            debug!("Assignment timer fired.");
            on_expiry.await;
          }
        }
      }
      .instrument(span),
    );
  }

  /// Cancels the pending task for the key. Returns whether one was armed.
  pub fn defuse(&self, order_id: &str, shipper_id: &str) -> bool {
    let key = (order_id.to_string(), shipper_id.to_string());
    match self.armed.lock().remove(&key) {
      Some(armed) => {
        armed.token.cancel();
        true
      }
      None => false,
    }
  }

  pub fn is_armed(&self, order_id: &str, shipper_id: &str) -> bool {
    self
      .armed
      .lock()
      .contains_key(&(order_id.to_string(), shipper_id.to_string()))
  }

  pub fn armed_count(&self) -> usize {
    self.armed.lock().len()
  }

  /// Cancels every pending task.
  pub fn cancel_all(&self) {
    for (_, armed) in self.armed.lock().drain() {
      armed.token.cancel();
    }
  }

  fn forget(&self, key: &TimerKey, generation: u64) {
    let mut armed = self.armed.lock();
    if armed.get(key).is_some_and(|a| a.generation == generation) {
      armed.remove(key);
    }
  }
}

impl std::fmt::Debug for AssignmentTimers {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AssignmentTimers").field("armed", &self.armed_count()).finish()
  }
}
