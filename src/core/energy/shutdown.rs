use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Cooperative stop signal shared by every monitor thread.
///
/// Sleeps go through [`ShutdownSignal::wait_timeout`] so a trigger wakes
/// sleeping monitors immediately instead of after their interval.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    triggered: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let mut triggered = self.triggered.lock();
        if !*triggered {
            *triggered = true;
            self.condvar.notify_all();
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.triggered.lock()
    }

    /// Sleep for `duration` or until triggered.
    ///
    /// Returns `true` when the signal was triggered.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut triggered = self.triggered.lock();
        while !*triggered {
            if self.condvar.wait_until(&mut triggered, deadline).timed_out() {
                break;
            }
        }
        *triggered
    }

    /// Block until triggered
    pub fn wait(&self) {
        let mut triggered = self.triggered.lock();
        while !*triggered {
            self.condvar.wait(&mut triggered);
        }
    }
}
