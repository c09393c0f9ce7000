/*
 * Time source abstraction. Every timestamp the application records (list
 * creation, last viewed, product completion, import dates) is taken from a
 * `ClockOperations` implementation so that the store and importers can be
 * tested deterministically.
 */
use time::OffsetDateTime;

pub trait ClockOperations: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/* Wall-clock time in UTC. */
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        SystemClock
    }
}

impl ClockOperations for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/*
 * A clock that only moves when told to. Used by unit tests across the crate
 * to assert exact timestamps.
 */
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<OffsetDateTime>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        ManualClock {
            now: std::sync::Mutex::new(start),
        }
    }

    pub fn advance(&self, by: time::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

#[cfg(test)]
impl ClockOperations for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_system_clock_is_utc_and_monotonic_enough() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
        assert!(first.offset().is_utc());
    }

    #[test]
    fn test_manual_clock_advances_only_on_request() {
        let clock = ManualClock::new(datetime!(2025-07-30 12:00:00 UTC));
        assert_eq!(clock.now(), datetime!(2025-07-30 12:00:00 UTC));
        clock.advance(time::Duration::minutes(5));
        assert_eq!(clock.now(), datetime!(2025-07-30 12:05:00 UTC));
    }
}
