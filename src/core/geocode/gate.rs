//! Rate gate serializing external geocoding requests.
//!
//! All callers funnel through one gate regardless of worker-pool size; the
//! gate owns "time of last call" state and blocks (never drops) until the
//! minimum inter-request delay has elapsed since the end of the previous
//! request.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Injectable time source, so tests can drive the gate without real sleeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The real clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Serializes requests and enforces a minimum delay between them.
pub struct RequestGate {
    min_delay: Duration,
    last_end: Mutex<Option<Instant>>,
    clock: Box<dyn Clock>,
}

impl RequestGate {
    /// Create a gate using the system clock.
    pub fn new(min_delay: Duration) -> Self {
        Self::with_clock(min_delay, Box::new(SystemClock))
    }

    /// Create a gate with an explicit clock (for tests).
    pub fn with_clock(min_delay: Duration, clock: Box<dyn Clock>) -> Self {
        Self {
            min_delay,
            last_end: Mutex::new(None),
            clock,
        }
    }

    /// Run a request inside the gate's critical section.
    ///
    /// Concurrent callers queue on the internal mutex rather than racing the
    /// timer independently. The delay is measured from the end of the
    /// previous request.
    pub fn run<T>(&self, request: impl FnOnce() -> T) -> T {
        let mut last_end = self.last_end.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(prev) = *last_end {
            let elapsed = self.clock.now().saturating_duration_since(prev);
            if elapsed < self.min_delay {
                self.clock.sleep(self.min_delay - elapsed);
            }
        }

        let result = request();
        *last_end = Some(self.clock.now());
        result
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// A clock advanced only by its own `sleep`, recording every sleep.
    pub struct ManualClock {
        origin: Instant,
        offset: Mutex<Duration>,
        slept: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                slept: Mutex::new(Vec::new()),
            }
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }

        pub fn advance(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + *self.offset.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
            self.advance(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn first_request_is_not_delayed() {
        let clock = Arc::new(ManualClock::new());
        let gate = RequestGate::with_clock(
            Duration::from_secs(1),
            Box::new(SharedClock(Arc::clone(&clock))),
        );

        gate.run(|| ());

        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn back_to_back_requests_wait_the_full_delay() {
        let clock = Arc::new(ManualClock::new());
        let gate = RequestGate::with_clock(
            Duration::from_secs(1),
            Box::new(SharedClock(Arc::clone(&clock))),
        );

        gate.run(|| ());
        gate.run(|| ());

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 1);
        assert_eq!(sleeps[0], Duration::from_secs(1));
    }

    #[test]
    fn elapsed_time_reduces_the_wait() {
        let clock = Arc::new(ManualClock::new());
        let gate = RequestGate::with_clock(
            Duration::from_secs(1),
            Box::new(SharedClock(Arc::clone(&clock))),
        );

        gate.run(|| ());
        clock.advance(Duration::from_millis(600));
        gate.run(|| ());

        let sleeps = clock.sleeps();
        assert_eq!(sleeps.len(), 1);
        assert_eq!(sleeps[0], Duration::from_millis(400));
    }

    #[test]
    fn long_idle_means_no_wait() {
        let clock = Arc::new(ManualClock::new());
        let gate = RequestGate::with_clock(
            Duration::from_secs(1),
            Box::new(SharedClock(Arc::clone(&clock))),
        );

        gate.run(|| ());
        clock.advance(Duration::from_secs(5));
        gate.run(|| ());

        assert!(clock.sleeps().is_empty());
    }

    /// Adapter so the test can keep a handle to the clock it hands the gate.
    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> Instant {
            self.0.now()
        }

        fn sleep(&self, duration: Duration) {
            self.0.sleep(duration);
        }
    }
}
