//! Fixed-size worker pool (C2) shared by the whole process. Algorithm and
//! rescorer groups borrow it to fan work out across threads; the pool itself
//! knows nothing about suggestions, only about running closures and tracking
//! how many are outstanding.
//!
//! Modelled on the session-pool pattern in the reranker's `inference::model`
//! module (a `crossbeam` structure guarding exclusive access to a fixed set
//! of resources) but turned around: here the fixed resources are worker
//! threads pulling jobs off a shared channel rather than pre-allocated
//! sessions handed out to callers.

mod latch;

pub use latch::{CompletionLatch, LatchGuard};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct InFlight {
    count: Mutex<usize>,
    cvar: Condvar,
}

impl InFlight {
    fn new() -> Self {
        Self {
            count: Mutex::new(0),
            cvar: Condvar::new(),
        }
    }

    fn increment(&self) {
        let mut n = self.count.lock().unwrap();
        *n += 1;
    }

    fn decrement(&self) {
        let mut n = self.count.lock().unwrap();
        *n -= 1;
        if *n == 0 {
            self.cvar.notify_all();
        }
    }

    fn load(&self) -> usize {
        *self.count.lock().unwrap()
    }

    fn wait(&self) {
        let mut n = self.count.lock().unwrap();
        while *n > 0 {
            n = self.cvar.wait(n).unwrap();
        }
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut n = self.count.lock().unwrap();
        let deadline = Instant::now() + timeout;
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
}

/// A fixed-size pool of worker threads pulling closures from a shared queue.
pub struct WorkerPool {
    sender: crossbeam::channel::Sender<Job>,
    in_flight: Arc<InFlight>,
    capacity: usize,
    shutting_down: AtomicBool,
}

impl WorkerPool {
    /// `size` worker threads are spawned immediately and live for the
    /// lifetime of the returned pool. `capacity` bounds `try_add`, not the
    /// underlying channel, which is unbounded so `add` never blocks the
    /// caller.
    pub fn new(size: usize, capacity: usize) -> Arc<Self> {
        let (sender, receiver) = crossbeam::channel::unbounded::<Job>();
        let in_flight = Arc::new(InFlight::new());

        for worker_id in 0..size {
            let receiver = receiver.clone();
            let in_flight = Arc::clone(&in_flight);
            thread::Builder::new()
                .name(format!("suggest-worker-{worker_id}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        job();
                        in_flight.decrement();
                    }
                })
                .expect("failed to spawn worker thread");
        }

        Arc::new(Self {
            sender,
            in_flight,
            capacity,
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Enqueue unconditionally; the in-flight counter increments immediately
    /// so a concurrent `wait` cannot observe a false-empty pool.
    pub fn add(&self, job: impl FnOnce() + Send + 'static) {
        if self.shutting_down.load(Ordering::Acquire) {
            return;
        }
        self.in_flight.increment();
        if self.sender.send(Box::new(job)).is_err() {
            self.in_flight.decrement();
        }
    }

    /// Enqueue iff currently in-flight count is below capacity. Returns
    /// whether the job was accepted; the caller owns it otherwise.
    pub fn try_add(&self, job: impl FnOnce() + Send + 'static) -> bool {
        if self.shutting_down.load(Ordering::Acquire) || self.in_flight.load() >= self.capacity {
            return false;
        }
        self.add(job);
        true
    }

    /// Block the calling thread until the in-flight count reaches zero.
    pub fn wait(&self) {
        self.in_flight.wait();
    }

    /// Same as `wait`, but returns whether the pool drained within `d`.
    pub fn wait_timeout(&self, d: Duration) -> bool {
        self.in_flight.wait_timeout(d)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load()
    }

    /// Signals producers-finished; outstanding jobs still run to completion
    /// but no further jobs are accepted.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }
}
