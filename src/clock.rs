use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};

/// Source of the current local timestamp. Handlers read the clock once per
/// request and pass explicit timestamps into the store layer, so store code
/// never consults wall-clock time itself.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub type SharedClock = Arc<dyn Clock>;

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Settable clock for deterministic tests.
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

#[cfg(test)]
impl ManualClock {
    pub fn starting_at(now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap() = to;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

/// Millisecond scalar used by the rate limiter's window arithmetic.
pub fn now_millis(now: NaiveDateTime) -> i64 {
    now.and_utc().timestamp_millis()
}
