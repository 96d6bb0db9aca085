// Copyright (c) 2024 Botho Foundation

//! Time sources.
//!
//! Protocol rules compare wall-clock seconds against deadlines and vote
//! windows, so the runtime never calls `SystemTime::now()` directly; it asks
//! a [`Clock`]. Tests drive a [`ManualClock`] instead.

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::UnixTimestamp;

pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> UnixTimestamp;
}

/// Reads the host clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixTimestamp {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs() as i64,
            // Host clock before 1970.
            Err(e) => -(e.duration().as_secs() as i64),
        }
    }
}

/// A settable clock shared between clones.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: UnixTimestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, now: UnixTimestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move the clock forward by `secs` and return the new time.
    pub fn advance(&self, secs: i64) -> UnixTimestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UnixTimestamp {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> UnixTimestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();

        assert_eq!(other.advance(SECONDS_PER_DAY), 1_000 + SECONDS_PER_DAY);
        assert_eq!(clock.now(), 1_000 + SECONDS_PER_DAY);

        clock.set(5);
        assert_eq!(other.now(), 5);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
