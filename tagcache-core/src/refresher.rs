use parking_lot::{Condvar, Mutex, MutexGuard};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::config::RefresherConfig;
use crate::error::{Error, Result};

/// Lifecycle state of a [`Refresher`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefresherState {
    Running,
    StopRequested,
    Stopped,
}

struct Shared {
    state: Mutex<RefresherState>,
    wakeup: Condvar,
}

/// Invokes a callback on a background thread at a fixed period.
///
/// The thread waits up to one period for a stop request; when the wait times
/// out the callback runs once and the wait starts over. A slow callback delays
/// the next wait, callbacks never overlap.
///
/// # Shutdown
///
/// [`stop`](Self::stop) (also run on drop) moves the refresher to
/// [`RefresherState::StopRequested`], wakes the thread and joins it. The state
/// is checked under its lock right before each callback, so no callback starts
/// once a stop has been requested. `stop` returns only after an in-flight
/// callback has completed and the thread has exited.
///
/// The state lock is released while the callback runs: the callback may read
/// [`state`](Self::state) of its own refresher. Stopping or dropping the
/// refresher from inside its own callback requests the stop without joining.
///
/// # Callback Failures
///
/// A panicking callback is caught and logged with `tracing::error!`; the
/// refresher keeps its schedule and calls it again at the next period.
///
/// # Examples
///
/// ```
/// use tagcache_core::{Refresher, RefresherState};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counted = Arc::clone(&calls);
///
/// let mut refresher = Refresher::with_period(Duration::from_millis(10), move || {
///     counted.fetch_add(1, Ordering::SeqCst);
/// })
/// .unwrap();
///
/// std::thread::sleep(Duration::from_millis(100));
/// refresher.stop();
/// assert_eq!(refresher.state(), RefresherState::Stopped);
///
/// let after_stop = calls.load(Ordering::SeqCst);
/// std::thread::sleep(Duration::from_millis(50));
/// assert_eq!(calls.load(Ordering::SeqCst), after_stop);
/// ```
pub struct Refresher {
    shared: Arc<Shared>,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    /// Starts a refresher with a period of `period_secs` whole seconds.
    ///
    /// Fails with [`Error::InvalidPeriod`] for a zero period.
    pub fn new<F>(period_secs: u64, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_period(Duration::from_secs(period_secs), callback)
    }

    /// Starts a refresher with an arbitrary non-zero period.
    pub fn with_period<F>(period: Duration, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::InvalidPeriod);
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(RefresherState::Running),
            wakeup: Condvar::new(),
        });

        let handle = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("tagcache-refresher".to_string())
                .spawn(move || run(&shared, period, callback))?
        };
        debug!(?period, "refresher started");

        Ok(Self {
            shared,
            period,
            handle: Some(handle),
        })
    }

    /// Starts a refresher with the period from `config`.
    pub fn with_config<F>(config: &RefresherConfig, callback: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_period(config.period(), callback)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RefresherState {
        *self.shared.state.lock()
    }

    /// Stops the refresher and waits for its thread to exit.
    ///
    /// Idempotent.
    pub fn stop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            if *state == RefresherState::Running {
                *state = RefresherState::StopRequested;
                self.shared.wakeup.notify_all();
            }
        }

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                debug!("refresher stopped from its own callback");
                return;
            }
            if handle.join().is_err() {
                error!("refresher thread terminated abnormally");
                *self.shared.state.lock() = RefresherState::Stopped;
            }
            debug!(period = ?self.period, "refresher stopped");
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<F: FnMut()>(shared: &Shared, period: Duration, mut callback: F) {
    let mut state = shared.state.lock();
    loop {
        // A period too large to represent as an instant never elapses.
        let deadline = Instant::now().checked_add(period);
        while *state == RefresherState::Running {
            match deadline {
                Some(deadline) => {
                    if shared.wakeup.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
                None => shared.wakeup.wait(&mut state),
            }
        }
        if *state != RefresherState::Running {
            break;
        }

        let outcome =
            MutexGuard::unlocked(&mut state, || catch_unwind(AssertUnwindSafe(&mut callback)));
        if outcome.is_err() {
            error!("refresh callback panicked, retrying at next period");
        }
    }
    *state = RefresherState::Stopped;
}
