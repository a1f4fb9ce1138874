//! Time source for the fetcher
//!
//! The fetcher only needs "now" and a blocking sleep. Abstracting both lets
//! tests drive the throttle without waiting on the wall clock.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Manually advanced clock. `sleep` advances time instantly and records
    /// the requested duration. Clones share the same timeline.
    #[derive(Clone)]
    pub struct FakeClock {
        origin: Instant,
        offset: Rc<Cell<Duration>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl FakeClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                // Start well past the origin so "now minus half the interval"
                // never underflows.
                offset: Rc::new(Cell::new(Duration::from_secs(3600))),
                sleeps: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn elapsed(&self) -> Duration {
            self.offset.get() - Duration::from_secs(3600)
        }

        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.borrow().clone()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.offset.set(self.offset.get() + duration);
        }
    }
}
