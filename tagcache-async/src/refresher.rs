use futures::FutureExt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tagcache_core::{Error, RefresherConfig, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Runs an async callback on a tokio task at a fixed period.
///
/// Each round sleeps for one period, racing a stop signal. The stop branch is
/// polled first and checked again before the callback starts, so once
/// [`stop`](Self::stop) has sent its signal no new callback begins. `stop`
/// then awaits the task, including any callback already in flight.
///
/// Dropping the refresher without calling `stop` aborts the task at its next
/// suspension point.
pub struct AsyncRefresher {
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    period: Duration,
}

impl AsyncRefresher {
    /// Spawns the refresher on the current tokio runtime.
    ///
    /// Fails with [`Error::InvalidPeriod`] for a zero period.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, callback: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::InvalidPeriod);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run(period, stop_rx, callback));
        debug!(?period, "async refresher started");

        Ok(Self {
            stop_tx,
            handle: Some(handle),
            period,
        })
    }

    /// Spawns a refresher with the period from `config`.
    pub fn with_config<F, Fut>(config: &RefresherConfig, callback: F) -> Result<Self>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(config.period(), callback)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Requests a stop and waits until the task has exited.
    pub async fn stop(mut self) {
        // The receiver is gone only if the task already exited.
        let _ = self.stop_tx.send(true);

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                error!(%err, "async refresher task terminated abnormally");
            }
        }
        debug!(period = ?self.period, "async refresher stopped");
    }
}

impl Drop for AsyncRefresher {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn run<F, Fut>(period: Duration, mut stop_rx: watch::Receiver<bool>, mut callback: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = tokio::time::sleep(period) => {}
        }
        let stopped = *stop_rx.borrow();
        if stopped {
            break;
        }

        // The callback may panic while building its future or while it is polled.
        let refresh = match catch_unwind(AssertUnwindSafe(&mut callback)) {
            Ok(refresh) => refresh,
            Err(_) => {
                error!("async refresh callback panicked, retrying at next period");
                continue;
            }
        };
        if AssertUnwindSafe(refresh).catch_unwind().await.is_err() {
            error!("async refresh callback panicked, retrying at next period");
        }
    }
}
