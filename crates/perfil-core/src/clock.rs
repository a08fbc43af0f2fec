//! Injected reference clock.
//!
//! The validator's year range and the repository's `creado` timestamp both
//! depend on "now". Reading ambient time directly would make them untestable,
//! so the clock is passed in.

use chrono::{DateTime, Datelike, Utc};

/// Source of the current time and the validator's reference year.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;

  fn current_year(&self) -> i32 { self.now().year() }
}

/// The ambient system clock — the only implementation outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}
