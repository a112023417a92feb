//! Wall-clock watchdog for bounding placement runs.
//!
//! The annealing loop is the only long-running part of the placer. A
//! [`Watchdog`] runs a timer thread that flips a shared [`TimeoutFlag`] when
//! the deadline passes; the loop polls the flag at coarse checkpoints and
//! unwinds gracefully, returning the best solution found so far.
//!
//! An optional *emergency* timer arms after the main deadline fires. If the
//! engine has not returned voluntarily within the emergency window (for
//! example, stuck inside a long pack), the emergency callback runs on the
//! timer thread. The callback is expected to serialize the best snapshot and
//! terminate the process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Shared cancellation flag, written once by the watchdog thread and polled
/// by the engine.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct TimeoutFlag {
    fired: Arc<AtomicBool>,
}

impl TimeoutFlag {
    /// Creates a flag that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the deadline has passed.
    pub fn timed_out(&self) -> bool {
        self.fired.load(Ordering::Relaxed)
    }

    fn fire(&self) {
        self.fired.store(true, Ordering::Relaxed);
    }
}

/// A wall-clock watchdog with an optional emergency finalizer.
pub struct Watchdog {
    flag: TimeoutFlag,
    returned: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    /// Starts a watchdog that fires after `timeout`.
    ///
    /// If `emergency` is given as `(delay, callback)`, the callback runs
    /// `delay` after the main deadline unless [`disarm`](Self::disarm) was
    /// called first. The callback must be self-contained: it may not assume
    /// the engine is in any consistent state.
    pub fn start(
        timeout: Duration,
        emergency: Option<(Duration, Box<dyn FnOnce() + Send>)>,
    ) -> Self {
        let flag = TimeoutFlag::new();
        let returned = Arc::new(AtomicBool::new(false));

        let thread_flag = flag.clone();
        let thread_returned = Arc::clone(&returned);
        let handle = thread::spawn(move || {
            // Sleep in short slices so an early disarm ends the thread
            // instead of holding the process open for the full timeout.
            let slice = Duration::from_millis(200);
            let mut elapsed = Duration::ZERO;
            while elapsed < timeout {
                if thread_returned.load(Ordering::Relaxed) {
                    return;
                }
                let step = slice.min(timeout - elapsed);
                thread::sleep(step);
                elapsed += step;
            }

            thread_flag.fire();

            if let Some((delay, callback)) = emergency {
                let mut waited = Duration::ZERO;
                while waited < delay {
                    if thread_returned.load(Ordering::Relaxed) {
                        return;
                    }
                    let step = slice.min(delay - waited);
                    thread::sleep(step);
                    waited += step;
                }
                if !thread_returned.load(Ordering::Relaxed) {
                    callback();
                }
            }
        });

        Self {
            flag,
            returned,
            handle: Some(handle),
        }
    }

    /// Returns a clone of the shared flag for the engine to poll.
    pub fn flag(&self) -> TimeoutFlag {
        self.flag.clone()
    }

    /// Marks the engine as voluntarily returned, preventing the emergency
    /// callback from running.
    pub fn disarm(&self) {
        self.returned.store(true, Ordering::Relaxed);
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.disarm();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
