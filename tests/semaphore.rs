mod common;

use common::{eventually, init_tracing, run_for, thread_count, Rng};
use crossbeam_utils::thread::scope;
use ksync::{CancelToken, Config, Error, ManualResetEvent, Semaphore, Timeout, UnarySemaphore};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

#[test]
fn requests_are_granted_in_arrival_order() {
    init_tracing();
    let sem = Semaphore::new(2);
    let order = Mutex::new(Vec::new());

    scope(|s| {
        // T1 takes both units
        assert_eq!(sem.acquire(2, Timeout::Infinite), Ok(true));

        let order = &order;
        let sem = &sem;
        s.spawn(move |_| {
            assert_eq!(sem.acquire(2, Timeout::Infinite), Ok(true));
            order.lock().unwrap().push(2);
        });
        eventually("the two unit request to queue", || sem.queued() == 1);

        s.spawn(move |_| {
            assert_eq!(sem.acquire(1, Timeout::Infinite), Ok(true));
            order.lock().unwrap().push(3);
        });
        eventually("the one unit request to queue", || sem.queued() == 2);

        // a single unit would satisfy the tail, but the head still blocks it
        sem.release(1).unwrap();
        assert_eq!(sem.available_units(), 1);
        assert_eq!(sem.queued(), 2);

        sem.release(1).unwrap();
        eventually("the head to be granted", || order.lock().unwrap().len() == 1);
        assert_eq!(sem.queued(), 1);
        sem.release(2).unwrap();
    })
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![2, 3]);
    assert_eq!(sem.available_units(), 1);
}

#[test]
fn unary_release_wakes_the_oldest_waiter() {
    init_tracing();
    let sem = UnarySemaphore::new(1);
    let order = Mutex::new(Vec::new());

    scope(|s| {
        // T1 takes the only unit
        assert_eq!(sem.acquire(Timeout::Infinite), Ok(true));

        let (sem, order) = (&sem, &order);
        for id in [2, 3] {
            s.spawn(move |_| {
                assert_eq!(sem.acquire(Timeout::Infinite), Ok(true));
                order.lock().unwrap().push(id);
            });
            eventually("the waiter to queue", || sem.queued() == id - 1);
        }

        sem.release().unwrap();
        eventually("T2 to be granted", || order.lock().unwrap().len() == 1);
        assert_eq!(*order.lock().unwrap(), vec![2]);
        assert_eq!(sem.queued(), 1);
        assert_eq!(sem.available_units(), 0);

        sem.release().unwrap();
    })
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![2, 3]);
    assert_eq!(sem.available_units(), 0);
}

#[test]
fn units_are_conserved_under_contention() {
    init_tracing();
    const UNITS: usize = 5;
    let sem = Semaphore::new(UNITS);
    let held = AtomicUsize::new(0);

    let acquired = run_for(thread_count(), Duration::from_millis(300), |id, stop| {
        let mut rng = Rng::new(id);
        let mut acquired = 0usize;
        while !stop.load(Ordering::Relaxed) {
            let units = 1 + rng.below(UNITS);
            let timeout = match rng.below(3) {
                0 => Timeout::NoWait,
                1 => Timeout::from_millis(2),
                _ => Timeout::from_millis(20),
            };

            if sem.acquire(units, timeout) == Ok(true) {
                let now = held.fetch_add(units, Ordering::SeqCst) + units;
                assert!(now <= UNITS, "{} units held out of {}", now, UNITS);
                thread::yield_now();
                held.fetch_sub(units, Ordering::SeqCst);
                sem.release(units).unwrap();
                acquired += 1;
            }
        }
        acquired
    });

    assert!(acquired.iter().sum::<usize>() > 0);
    assert_eq!(sem.available_units(), UNITS);
    assert_eq!(sem.queued(), 0);
}

#[test]
fn every_contender_makes_progress() {
    init_tracing();
    let sem = UnarySemaphore::new(1);
    let counts = run_for(thread_count(), Duration::from_millis(200), |_, stop| {
        let mut count = 0usize;
        while !stop.load(Ordering::Relaxed) {
            if sem.acquire(Timeout::from_millis(50)) == Ok(true) {
                count += 1;
                sem.release().unwrap();
            }
        }
        count
    });

    let min = counts.iter().copied().min().unwrap_or(0);
    let max = counts.iter().copied().max().unwrap_or(0);
    tracing::info!(min, max, "unary semaphore turns per thread");
    assert!(min > 0, "a contender starved: {:?}", counts);
    assert_eq!(sem.available_units(), 1);
}

#[test]
fn timeout_is_honoured() {
    init_tracing();
    let sem = Semaphore::new(0);
    let timeout = Duration::from_millis(50);

    let started = Instant::now();
    assert_eq!(sem.acquire(1, timeout), Ok(false));
    let elapsed = started.elapsed();

    assert!(elapsed >= timeout, "returned after {:?}", elapsed);
    assert!(elapsed < timeout * 20, "returned after {:?}", elapsed);
    assert_eq!(sem.queued(), 0);
}

#[test]
fn cancelled_waiters_leave_the_rest_intact() {
    init_tracing();
    let sem = Semaphore::new(0);
    let doomed = CancelToken::new();

    scope(|s| {
        let (sem, doomed) = (&sem, &doomed);
        let waiters: Vec<_> = (0..8)
            .map(|i| {
                s.spawn(move |_| {
                    if i % 2 == 0 {
                        sem.acquire_with(1, Timeout::Infinite, doomed)
                    } else {
                        sem.acquire(1, Timeout::Infinite)
                    }
                })
            })
            .collect();
        eventually("all waiters to queue", || sem.queued() == 8);

        doomed.cancel();
        eventually("cancelled waiters to leave", || sem.queued() == 4);
        sem.release(4).unwrap();

        for (i, waiter) in waiters.into_iter().enumerate() {
            let expected = if i % 2 == 0 { Err(Error::Cancelled) } else { Ok(true) };
            assert_eq!(waiter.join().unwrap(), expected);
        }
    })
    .unwrap();

    assert_eq!(sem.available_units(), 0);
    assert_eq!(sem.queued(), 0);
}

#[test]
fn grant_wins_over_late_cancellation() {
    init_tracing();
    let parked = Arc::new(ManualResetEvent::new(false));
    let gate = Arc::new(ManualResetEvent::new(false));

    let config = {
        let (parked, gate) = (parked.clone(), gate.clone());
        Config::builder()
            .name("late-cancel")
            .on_park(move || parked.set())
            .on_unpark(move || {
                let _ = gate.wait(Timeout::Infinite);
            })
            .build()
    };
    let sem = Semaphore::with_config(0, config);
    let token = CancelToken::new();

    scope(|s| {
        let waiter = s.spawn(|_| sem.acquire_with(1, Timeout::Infinite, &token));
        assert_eq!(parked.wait(Timeout::Infinite), Ok(true));

        // the grant lands first, the cancellation while the waiter is
        // still on its way back into the monitor
        sem.release(1).unwrap();
        token.cancel();
        gate.set();

        assert_eq!(waiter.join().unwrap(), Ok(true));
    })
    .unwrap();

    assert!(token.is_cancelled());
    assert_eq!(sem.available_units(), 0);
    assert_eq!(sem.queued(), 0);
}

#[test]
fn ambient_token_interrupts_blocked_thread() {
    init_tracing();
    let sem = Semaphore::new(0);
    let token = Mutex::new(None);
    let retried = AtomicBool::new(false);

    scope(|s| {
        let waiter = s.spawn(|_| {
            *token.lock().unwrap() = Some(CancelToken::current());
            let first = sem.acquire(1, Timeout::Infinite);

            // sticky until reset
            assert_eq!(sem.acquire(1, Timeout::Infinite), Err(Error::Cancelled));
            assert!(CancelToken::current().reset());

            retried.store(true, Ordering::SeqCst);
            let second = sem.acquire(1, Timeout::Infinite);
            (first, second)
        });

        eventually("the waiter to queue", || sem.queued() == 1);
        let token = token.lock().unwrap().take().unwrap();
        token.cancel();

        eventually("the waiter to retry", || {
            retried.load(Ordering::SeqCst) && sem.queued() == 1
        });
        sem.release(1).unwrap();

        assert_eq!(waiter.join().unwrap(), (Err(Error::Cancelled), Ok(true)));
    })
    .unwrap();
}
