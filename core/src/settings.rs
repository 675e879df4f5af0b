// pantry/src/settings.rs

use chrono::NaiveTime;
use std::time::Duration;

/// Tunables of the lifecycle core. The server fills these from its environment.
#[derive(Debug, Clone)]
pub struct Settings {
  /// How long an offered shipment waits for the shipper before it is withdrawn.
  pub assignment_timeout: Duration,
  /// Period of the stale-assignment sweep.
  pub sweep_interval: Duration,
  pub earliest_shift_start: NaiveTime,
  pub latest_shift_end: NaiveTime,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      assignment_timeout: Duration::from_secs(15 * 60),
      sweep_interval: Duration::from_secs(60),
      earliest_shift_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
      latest_shift_end: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
    }
  }
}
