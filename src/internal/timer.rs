use super::Signal;
use parking_lot::{Condvar, Mutex};
use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, OnceLock, Weak},
    thread,
    time::Instant,
};

type Key = (Instant, u64);

#[derive(Default)]
struct Queue {
    entries: BTreeMap<Key, Weak<Signal>>,
    next_id: u64,
}

/// Wakes the signals of asynchronous waiters once their deadline passes.
///
/// Blocking waiters time out on their own condvar; a polled future has no
/// thread to do that, so one shared thread keeps the pending deadlines
/// ordered and wakes each signal when its instant is reached. Entries only
/// hold a weak reference, so a request that completed early costs nothing
/// but a map slot until its deadline.
pub(crate) struct Timer {
    queue: Mutex<Queue>,
    cond: Condvar,
}

static TIMER: OnceLock<Option<Arc<Timer>>> = OnceLock::new();

impl Timer {
    /// The process-wide timer, started on first use.
    ///
    /// `None` if its thread could not be spawned.
    pub fn global() -> Option<&'static Timer> {
        TIMER
            .get_or_init(|| match Self::start() {
                Ok(timer) => Some(timer),
                Err(error) => {
                    tracing::error!(%error, "failed to spawn the timer thread");
                    None
                }
            })
            .as_deref()
    }

    fn start() -> io::Result<Arc<Self>> {
        let timer = Arc::new(Self {
            queue: Mutex::new(Queue::default()),
            cond: Condvar::new(),
        });

        let worker = timer.clone();
        thread::Builder::new()
            .name(String::from("ksync-timer"))
            .spawn(move || worker.run())?;
        Ok(timer)
    }

    pub fn schedule(&self, deadline: Instant, signal: &Arc<Signal>) {
        let mut queue = self.queue.lock();
        let id = queue.next_id;
        queue.next_id += 1;

        let is_earliest = queue
            .entries
            .keys()
            .next()
            .map_or(true, |&(earliest, _)| deadline < earliest);
        queue.entries.insert((deadline, id), Arc::downgrade(signal));

        if is_earliest {
            self.cond.notify_one();
        }
    }

    fn run(&self) {
        let mut expired = Vec::new();
        let mut queue = self.queue.lock();
        loop {
            let now = Instant::now();
            while let Some(entry) = queue.entries.first_entry() {
                if entry.key().0 > now {
                    break;
                }
                expired.push(entry.remove());
            }

            if !expired.is_empty() {
                parking_lot::MutexGuard::unlocked(&mut queue, || {
                    expired
                        .drain(..)
                        .filter_map(|signal| signal.upgrade())
                        .for_each(|signal| signal.wake());
                });
                continue;
            }

            match queue.entries.keys().next() {
                Some(&(deadline, _)) => {
                    self.cond.wait_until(&mut queue, deadline);
                }
                None => self.cond.wait(&mut queue),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        task::{Wake, Waker},
        time::Duration,
    };

    #[derive(Default)]
    struct Flag(AtomicBool);

    impl Wake for Flag {
        fn wake(self: Arc<Self>) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn wakes_signal_at_deadline() {
        let timer = Timer::global().unwrap();
        let flag = Arc::new(Flag::default());
        let signal = Signal::new();
        signal.register_waker(&Waker::from(flag.clone()));

        let deadline = Instant::now() + Duration::from_millis(20);
        timer.schedule(deadline, &signal);
        while !flag.0.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(Instant::now() >= deadline);
        assert!(!signal.is_fulfilled());
    }

    #[test]
    fn dropped_signal_is_skipped() {
        let timer = Timer::global().unwrap();
        let flag = Arc::new(Flag::default());
        let kept = Signal::new();
        kept.register_waker(&Waker::from(flag.clone()));

        let now = Instant::now();
        timer.schedule(now + Duration::from_millis(5), &Signal::new());
        timer.schedule(now + Duration::from_millis(10), &kept);
        while !flag.0.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
    }
}
