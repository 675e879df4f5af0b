// pantry/src/services/clock.rs

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;

/// Wall clock in the store's operating timezone.
pub trait Clock: Send + Sync + std::fmt::Debug {
  fn now(&self) -> DateTime<Utc>;

  fn timezone(&self) -> Tz;

  /// Time of day in [`Clock::timezone`], used for shift windows.
  fn local_time(&self) -> NaiveTime {
    self.now().with_timezone(&self.timezone()).time()
  }

  fn today(&self) -> NaiveDate {
    self.now().with_timezone(&self.timezone()).date_naive()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  tz: Tz,
}

impl SystemClock {
  pub fn new(tz: Tz) -> Self {
    Self { tz }
  }
}

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }

  fn timezone(&self) -> Tz {
    self.tz
  }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
  tz: Tz,
  now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>, tz: Tz) -> Self {
    Self {
      tz,
      now: Mutex::new(start),
    }
  }

  pub fn set(&self, at: DateTime<Utc>) {
    *self.now.lock() = at;
  }

  pub fn advance(&self, by: chrono::Duration) {
    let mut now = self.now.lock();
    *now += by;
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    *self.now.lock()
  }

  fn timezone(&self) -> Tz {
    self.tz
  }
}
