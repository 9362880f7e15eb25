//! Scripted clock for deterministic timestamps.

use std::sync::{
    Arc,
    atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, TimeDelta, Utc};
use pomochat_core::Environment;

/// 2024-01-01T00:00:00Z
const DEFAULT_START_SECS: i64 = 1_704_067_200;

/// Clock that advances one second per reading.
///
/// Clones share the same counter, so every session built from one `SimEnv`
/// sees a single timeline.
#[derive(Debug, Clone)]
pub struct SimEnv {
    start: DateTime<Utc>,
    readings: Arc<AtomicI64>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Clock starting at 2024-01-01T00:00:00Z.
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(DEFAULT_START_SECS))
    }

    /// Clock starting at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, readings: Arc::new(AtomicI64::new(0)) }
    }

    /// Number of times the clock has been read.
    pub fn readings(&self) -> i64 {
        self.readings.load(Ordering::SeqCst)
    }
}

impl Environment for SimEnv {
    fn now(&self) -> DateTime<Utc> {
        let n = self.readings.fetch_add(1, Ordering::SeqCst);
        self.start + TimeDelta::seconds(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_one_second_per_reading() {
        let env = SimEnv::new();

        assert_eq!(env.timestamp(), "2024-01-01T00:00:00.000Z");
        assert_eq!(env.timestamp(), "2024-01-01T00:00:01.000Z");
        assert_eq!(env.readings(), 2);
    }

    #[test]
    fn clones_share_timeline() {
        let env = SimEnv::new();
        let other = env.clone();

        env.now();
        assert_eq!(other.timestamp(), "2024-01-01T00:00:01.000Z");
    }
}
