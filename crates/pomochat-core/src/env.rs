//! Environment abstraction for deterministic testing.
//!
//! Decouples the session from the system clock. Production uses the real
//! wall clock, simulation uses a scripted clock so outbound timestamps are
//! reproducible.

use chrono::{DateTime, SecondsFormat, Utc};

/// Abstract environment providing wall-clock time.
///
/// # Invariants
///
/// - `now()` should not go backwards within a single session. Timestamps are
///   informational only; ordering is always arrival order.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time in UTC.
    fn now(&self) -> DateTime<Utc>;

    /// Current time rendered as an ISO-8601 string.
    ///
    /// Millisecond precision with a `Z` suffix, e.g.
    /// `2024-01-01T00:00:00.000Z`.
    fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[derive(Clone)]
    struct FixedEnv;

    impl Environment for FixedEnv {
        fn now(&self) -> DateTime<Utc> {
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        }
    }

    #[test]
    fn timestamp_is_iso8601_with_millis() {
        assert_eq!(FixedEnv.timestamp(), "2024-01-01T00:00:00.000Z");
    }
}
