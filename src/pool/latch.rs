//! Completion-count latch (C3): a countdown barrier with timed wait, used to
//! await "N leaf tasks done" without giving the orchestrator a handle to
//! cancel them.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

pub struct CompletionLatch {
    count: Mutex<usize>,
    cvar: Condvar,
}

impl CompletionLatch {
    pub fn new(n: usize) -> Arc<Self> {
        Arc::new(Self {
            count: Mutex::new(n),
            cvar: Condvar::new(),
        })
    }

    /// Decrements the count by one. A latch already at zero is left alone;
    /// callers are expected to notify at most once per unit of work, via
    /// [`CompletionLatch::guard`].
    pub fn notify(&self) {
        let mut n = self.count.lock().unwrap();
        if *n > 0 {
            *n -= 1;
            if *n == 0 {
                self.cvar.notify_all();
            }
        }
    }

    pub fn wait(&self) {
        let mut n = self.count.lock().unwrap();
        while *n > 0 {
            n = self.cvar.wait(n).unwrap();
        }
    }

    /// Returns whether the count reached zero within `d`.
    pub fn wait_timeout(&self, d: Duration) -> bool {
        let mut n = self.count.lock().unwrap();
        let deadline = Instant::now() + d;
        while *n > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return *n == 0;
            }
            let (guard, result) = self.cvar.wait_timeout(n, remaining).unwrap();
            n = guard;
            if result.timed_out() && *n > 0 {
                return false;
            }
        }
        true
    }

    /// Scoped notifier: guarantees the latch is decremented exactly once on
    /// every exit path of the task that holds the guard, success, failure,
    /// or unwind.
    pub fn guard(self: &Arc<Self>) -> LatchGuard {
        LatchGuard {
            latch: Arc::clone(self),
        }
    }
}

pub struct LatchGuard {
    latch: Arc<CompletionLatch>,
}

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.latch.notify();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_unblocks_at_zero() {
        let latch = CompletionLatch::new(3);
        for _ in 0..3 {
            latch.notify();
        }
        latch.wait();
    }

    #[test]
    fn wait_timeout_reports_undrained_latch() {
        let latch = CompletionLatch::new(1);
        assert!(!latch.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn guard_notifies_on_panic_unwind() {
        let latch = CompletionLatch::new(1);
        let latch_clone = Arc::clone(&latch);
        let handle = thread::spawn(move || {
            let _guard = latch_clone.guard();
            panic!("simulated leaf failure");
        });
        let _ = handle.join();
        assert!(latch.wait_timeout(Duration::from_millis(200)));
    }

    #[test]
    fn extra_notify_is_a_no_op() {
        let latch = CompletionLatch::new(1);
        latch.notify();
        latch.notify();
        latch.wait();
    }
}
