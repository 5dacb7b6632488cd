#![allow(dead_code)]

use crossbeam_utils::thread::scope;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Once,
    },
    thread,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Polls `check` until it holds, failing the test after ten seconds.
pub fn eventually(what: &str, check: impl Fn() -> bool) {
    let give_up = Instant::now() + Duration::from_secs(10);
    while !check() {
        assert!(Instant::now() < give_up, "gave up waiting for {}", what);
        thread::sleep(Duration::from_millis(1));
    }
}

pub fn thread_count() -> usize {
    num_cpus::get().clamp(2, 8) * 2
}

/// Runs `threads` copies of `work` until `duration` has passed.
///
/// Each copy gets its index and is expected to loop until the stop flag is
/// raised. Returns whatever each copy returned, in index order.
pub fn run_for<T, F>(threads: usize, duration: Duration, work: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize, &AtomicBool) -> T + Sync,
{
    let stop = AtomicBool::new(false);
    scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|id| {
                let (work, stop) = (&work, &stop);
                s.spawn(move |_| work(id, stop))
            })
            .collect();

        thread::sleep(duration);
        stop.store(true, Ordering::Relaxed);

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    })
    .unwrap()
}

/// A small xorshift generator so the stress tests need no extra dependency.
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: usize) -> Self {
        Self((seed as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }

    pub fn below(&mut self, n: usize) -> usize {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 % n as u64) as usize
    }
}
