//! Per-reactor bounded-time monitors.
//!
//! A watchdog owns a dedicated monitor thread waiting on its expiration
//! instant. Starting an armed watchdog again moves the deadline;
//! stopping it returns the thread to an indefinite wait. If the deadline
//! elapses with no further extension, the handler runs on the monitor
//! thread under the watchdog mutex.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::{LogicalClock, Timestamp};

pub trait WatchdogFn: FnMut() + Send {}
impl<F> WatchdogFn for F where F: FnMut() + Send {}

#[derive(Debug)]
struct WatchdogState {
    /// Instant at which the handler fires; `None` waits indefinitely.
    expiration: Option<Timestamp>,
    /// The monitor is counting down.
    active: bool,
    /// The monitor thread should exit.
    terminate: bool,
}

struct WatchdogInner {
    state: Mutex<WatchdogState>,
    cond: Condvar,
}

/// A per-reactor timer that fires a handler if its deadline elapses
/// without being renewed. Owns no reactions.
pub struct Watchdog {
    name: String,
    min_expiration: Duration,
    clock: Arc<LogicalClock>,
    inner: Arc<WatchdogInner>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("name", &self.name)
            .field("min_expiration", &self.min_expiration)
            .field("state", &*self.inner.state.lock())
            .finish_non_exhaustive()
    }
}

impl Watchdog {
    /// Spawn the monitor thread. The watchdog starts disarmed.
    pub fn new(
        name: impl Into<String>,
        min_expiration: Duration,
        clock: Arc<LogicalClock>,
        handler: impl WatchdogFn + 'static,
    ) -> Self {
        let name = name.into();
        let inner = Arc::new(WatchdogInner {
            state: Mutex::new(WatchdogState {
                expiration: None,
                active: false,
                terminate: false,
            }),
            cond: Condvar::new(),
        });
        let thread = {
            let inner = inner.clone();
            let thread_name = format!("watchdog-{name}");
            let watchdog_name = name.clone();
            std::thread::Builder::new()
                .name(thread_name)
                .spawn(move || monitor(&watchdog_name, &inner, Box::new(handler)))
                .expect("failed to spawn watchdog thread")
        };
        Self {
            name,
            min_expiration,
            clock,
            inner,
            thread: Some(thread),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arm the watchdog: the handler fires `min_expiration + additional`
    /// past the current logical time unless renewed or stopped first.
    pub fn start(&self, additional: Duration) {
        let expiration = self
            .clock
            .logical_now()
            .forward(self.min_expiration + additional);
        let mut state = self.inner.state.lock();
        state.terminate = false;
        state.expiration = Some(expiration);
        if !state.active {
            state.active = true;
            self.inner.cond.notify_one();
        }
        tracing::trace!(watchdog = %self.name, ?expiration, "Watchdog armed");
    }

    /// Disarm without firing; the monitor returns to its indefinite wait.
    pub fn stop(&self) {
        let mut state = self.inner.state.lock();
        state.expiration = None;
        self.inner.cond.notify_one();
        tracing::trace!(watchdog = %self.name, "Watchdog disarmed");
    }

    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.terminate = true;
            state.expiration = None;
            self.inner.cond.notify_one();
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn monitor(name: &str, inner: &WatchdogInner, mut handler: Box<dyn WatchdogFn>) {
    let mut state = inner.state.lock();
    loop {
        if state.terminate {
            break;
        }
        match state.expiration {
            None => {
                // Disarmed (or just fired): wait for the next start().
                state.active = false;
                inner.cond.wait(&mut state);
            }
            Some(expiration) => {
                let now = Timestamp::now();
                if let Some(remaining) = now.remaining_until(expiration) {
                    // The deadline may move or be cleared while waiting;
                    // re-check both expiration and terminate on every
                    // wake, spurious or not.
                    let deadline = Instant::now() + remaining;
                    inner.cond.wait_until(&mut state, deadline);
                } else {
                    tracing::debug!(watchdog = %name, "Watchdog expired, invoking handler");
                    handler();
                    state.active = false;
                    state.expiration = None;
                }
            }
        }
    }
    tracing::trace!(watchdog = %name, "Watchdog terminated");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, RecvTimeoutError};

    fn test_clock() -> Arc<LogicalClock> {
        Arc::new(LogicalClock::new(Timestamp::now()))
    }

    #[test_log::test]
    fn test_fires_after_deadline() {
        let (tx, rx) = unbounded();
        let watchdog = Watchdog::new("fires", Duration::from_millis(30), test_clock(), move || {
            tx.send(Timestamp::now()).unwrap();
        });

        watchdog.start(Duration::ZERO);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("handler did not fire");
        assert!(!watchdog.is_active(), "watchdog disarms after firing");
    }

    #[test_log::test]
    fn test_extension_defers_handler() {
        let (tx, rx) = unbounded();
        let started = Timestamp::now();
        let clock = test_clock();
        let watchdog = Watchdog::new("extend", Duration::from_millis(80), clock, move || {
            tx.send(Timestamp::now()).unwrap();
        });

        watchdog.start(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(30));
        // Renew before the first deadline: fires only at the new one.
        watchdog.start(Duration::from_millis(120));

        let fired_at = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("handler did not fire");
        let elapsed = fired_at.elapsed_since(started);
        assert!(
            elapsed >= Duration::from_millis(200),
            "fired after {elapsed:?}, before the extended deadline"
        );
    }

    #[test_log::test]
    fn test_stop_suppresses_handler() {
        let (tx, rx) = unbounded();
        let watchdog = Watchdog::new("stops", Duration::from_millis(100), test_clock(), move || {
            tx.send(()).unwrap();
        });

        watchdog.start(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        watchdog.stop();

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(300)),
            Err(RecvTimeoutError::Timeout),
            "handler ran after stop"
        );

        // The monitor is back in its indefinite wait and can be rearmed.
        watchdog.start(Duration::ZERO);
        rx.recv_timeout(Duration::from_secs(2))
            .expect("handler did not fire after rearm");
    }

    #[test_log::test]
    fn test_terminate_joins_quickly() {
        let watchdog = Watchdog::new(
            "terminates",
            Duration::from_secs(3600),
            test_clock(),
            || {},
        );
        watchdog.start(Duration::ZERO);
        let begun = Instant::now();
        drop(watchdog);
        assert!(begun.elapsed() < Duration::from_secs(1));
    }
}
