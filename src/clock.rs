use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Source of the current instant, injectable so SLA math and status history
/// timestamps stay deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used by the running service.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an instant that tests and the CLI demo can advance.
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.instant.lock().expect("clock mutex poisoned");
        *guard = *guard + delta;
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut guard = self.instant.lock().expect("clock mutex poisoned");
        *guard = instant;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.instant.lock().expect("clock mutex poisoned")
    }
}
