use std::fmt;
use std::hint::black_box;

use crate::lock::{Mutex, ReentrantMutex};

// Process-wide so the compiler cannot prove the locks are thread-private.
static MONITOR: ReentrantMutex<()> = ReentrantMutex::new(());
static EXPLICIT_LOCK: Mutex<()> = Mutex::new(());

/// Takes an iteration count, returns the final counter value.
pub type Runner = fn(u64) -> u64;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    NoLock,
    MonitorLock,
    ExplicitLock,
}

impl Strategy {
    /// Every strategy, in the order the driver runs them.
    pub const ALL: [Strategy; 3] = [
        Strategy::NoLock,
        Strategy::MonitorLock,
        Strategy::ExplicitLock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::NoLock => "NoLock",
            Strategy::MonitorLock => "MonitorLock",
            Strategy::ExplicitLock => "ExplicitLock",
        }
    }

    pub fn runner(self) -> Runner {
        match self {
            Strategy::NoLock => run_no_lock,
            Strategy::MonitorLock => run_monitor_lock,
            Strategy::ExplicitLock => run_explicit_lock,
        }
    }

    pub fn run(self, iterations: u64) -> u64 {
        (self.runner())(iterations)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// `black_box(&mut counter)` forces every increment to be materialised, so
// the loops cannot collapse into `counter = iterations`.

pub fn run_no_lock(iterations: u64) -> u64 {
    let mut counter = 0u64;
    for _ in 0..black_box(iterations) {
        counter += 1;
        black_box(&mut counter);
    }
    counter
}

pub fn run_monitor_lock(iterations: u64) -> u64 {
    let mut counter = 0u64;
    for _ in 0..black_box(iterations) {
        MONITOR.synchronized(|_| {
            counter += 1;
            black_box(&mut counter);
        });
    }
    counter
}

pub fn run_explicit_lock(iterations: u64) -> u64 {
    let mut counter = 0u64;
    for _ in 0..black_box(iterations) {
        let guard = EXPLICIT_LOCK.lock();
        counter += 1;
        black_box(&mut counter);
        // Unwinding out of the increment would release through the guard too.
        drop(guard);
    }
    counter
}

#[test]
fn test_every_strategy_counts_exactly() {
    for strategy in Strategy::ALL {
        for n in [0, 1, 2, 17, 1_000, 65_537] {
            assert_eq!(strategy.run(n), n, "{strategy} with {n} iterations");
        }
    }
}

#[test]
fn test_fixed_order_and_names() {
    let names: Vec<_> = Strategy::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["NoLock", "MonitorLock", "ExplicitLock"]);
    assert!(names.iter().all(|name| name.len() <= 14));
}

#[test]
fn test_locks_released_after_run() {
    Strategy::MonitorLock.run(10);
    Strategy::ExplicitLock.run(10);

    assert!(!MONITOR.is_owned_by_current_thread());
    // Other tests share the static, so only check it can be taken again.
    drop(EXPLICIT_LOCK.lock());
}

#[test]
fn test_monitor_strategy_is_reentrant_safe() {
    // Running inside an already held monitor must not deadlock.
    let counted = MONITOR.synchronized(|_| Strategy::MonitorLock.run(100));
    assert_eq!(counted, 100);
}
