use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// A composite (wall-clock millis, per-process counter) timestamp.
///
/// §9: "Do not rely on the wall clock for ordering within a process." Two
/// calls to [`MonotonicClock::now`] within the same process always compare as
/// strictly increasing, even if the wall clock itself does not advance (or
/// goes backwards), because the tie-break counter always advances.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct MonotonicTimestamp {
    pub unix_millis: i64,
    pub seq: i64,
}

impl MonotonicTimestamp {
    pub const EPOCH: MonotonicTimestamp = MonotonicTimestamp {
        unix_millis: 0,
        seq: 0,
    };

    pub fn to_rfc3339(self) -> String {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.unix_millis)
            .unwrap_or_default()
            .to_rfc3339()
    }
}

impl std::fmt::Display for MonotonicTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.unix_millis, self.seq)
    }
}

impl std::str::FromStr for MonotonicTimestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((millis, seq)) => Ok(MonotonicTimestamp {
                unix_millis: millis.parse()?,
                seq: seq.parse()?,
            }),
            None => Ok(MonotonicTimestamp {
                unix_millis: s.parse()?,
                seq: 0,
            }),
        }
    }
}

/// Process-wide monotonic clock. `Store::monotonic_now` in every backend
/// delegates to a single shared instance so changelog ordering is coherent
/// across concurrent transactions within the process.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    counter: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            counter: AtomicI64::new(0),
        }
    }

    /// Returns a timestamp guaranteed to be strictly greater than any
    /// timestamp previously returned by this clock instance.
    pub fn now(&self) -> MonotonicTimestamp {
        let unix_millis = chrono::Utc::now().timestamp_millis();
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        MonotonicTimestamp { unix_millis, seq }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_calls_strictly_increase() {
        let clock = MonotonicClock::new();
        let mut last = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > last, "{next:?} should be greater than {last:?}");
            last = next;
        }
    }

    #[test]
    fn round_trips_through_string() {
        let ts = MonotonicTimestamp {
            unix_millis: 12345,
            seq: 7,
        };
        let s = ts.to_string();
        let parsed: MonotonicTimestamp = s.parse().unwrap();
        assert_eq!(ts, parsed);
    }
}
