//! Network reachability tracking.
//!
//! `ConnectivityMonitor` is the seam the sync layer depends on. Two
//! implementations are provided:
//!
//! - `NetworkMonitor`: probes a TCP endpoint on an interval in a background task
//! - `ManualConnectivity`: a settable flag, used for forced-offline mode and tests
//!
//! Neither ever fails. A monitor that cannot start reports "disconnected".

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Upper bound on a single reachability probe.
const PROBE_TIMEOUT_SECS: u64 = 3;

pub trait ConnectivityMonitor: Send + Sync {
    /// Point-in-time reachability.
    fn is_connected(&self) -> bool;

    /// Current reachability followed by every subsequent transition. Each call
    /// starts a fresh stream; it ends when the monitor is shut down or dropped.
    fn subscribe(&self) -> BoxStream<'static, bool>;
}

/// Turn a watch receiver into a "current value, then changes" stream.
fn watch_stream(mut rx: watch::Receiver<bool>) -> BoxStream<'static, bool> {
    let current = *rx.borrow_and_update();
    stream::once(async move { current })
        .chain(stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let connected = *rx.borrow_and_update();
            Some((connected, rx))
        }))
        .boxed()
}

/// Like `watch_stream`, but ends as soon as `stop` turns true.
fn watch_stream_until(
    mut rx: watch::Receiver<bool>,
    stop: watch::Receiver<bool>,
) -> BoxStream<'static, bool> {
    let current = *rx.borrow_and_update();
    stream::once(async move { current })
        .chain(stream::unfold((rx, stop), |(mut rx, mut stop)| async move {
            if *stop.borrow_and_update() {
                return None;
            }
            let changed = tokio::select! {
                res = rx.changed() => res.is_ok(),
                _ = stop.changed() => false,
            };
            if !changed {
                return None;
            }
            let connected = *rx.borrow_and_update();
            Some((connected, (rx, stop)))
        }))
        .boxed()
}

// ============================================================================
// NetworkMonitor
// ============================================================================

/// Polls reachability of `probe_host` (a `host:port` pair) and publishes changes.
///
/// The background task is registered lazily on first use and torn down by
/// `shutdown` or on drop. A monitor that has been shut down stays down.
pub struct NetworkMonitor {
    probe_host: String,
    interval: Duration,
    tx: Arc<watch::Sender<bool>>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    pub fn new(probe_host: impl Into<String>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(false);
        let (stop, _stop_rx) = watch::channel(false);
        Self {
            probe_host: probe_host.into(),
            interval,
            tx: Arc::new(tx),
            stop,
            task: Mutex::new(None),
        }
    }

    async fn probe(host: &str) -> bool {
        match tokio::time::timeout(
            Duration::from_secs(PROBE_TIMEOUT_SECS),
            TcpStream::connect(host),
        )
        .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(host = host, error = %e, "Reachability probe failed");
                false
            }
            Err(_) => {
                debug!(host = host, "Reachability probe timed out");
                false
            }
        }
    }

    fn publish(tx: &watch::Sender<bool>, connected: bool) {
        let changed = tx.send_if_modified(|current| {
            if *current != connected {
                *current = connected;
                true
            } else {
                false
            }
        });
        if changed {
            info!(connected = connected, "Connectivity changed");
        }
    }

    fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Probe once right now and publish the result. After shutdown this only
    /// reports the last published value.
    pub async fn check_now(&self) -> bool {
        if self.is_stopped() {
            return *self.tx.borrow();
        }
        self.ensure_started();
        let connected = Self::probe(&self.probe_host).await;
        Self::publish(&self.tx, connected);
        connected
    }

    fn ensure_started(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if task.is_some() || self.is_stopped() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "Unable to start reachability monitor, treating as offline");
                return;
            }
        };

        let tx = Arc::clone(&self.tx);
        let host = self.probe_host.clone();
        let interval = self.interval;
        debug!(host = %host, ?interval, "Starting reachability monitor");

        *task = Some(handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let connected = Self::probe(&host).await;
                Self::publish(&tx, connected);
            }
        }));
    }

    /// Stop the background probe for good and end every subscriber stream.
    /// `is_connected` keeps returning the last published value.
    pub fn shutdown(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.stop.send_if_modified(|stopped| !std::mem::replace(stopped, true));
        if let Some(handle) = task.take() {
            debug!("Stopping reachability monitor");
            handle.abort();
        }
    }
}

impl ConnectivityMonitor for NetworkMonitor {
    fn is_connected(&self) -> bool {
        self.ensure_started();
        *self.tx.borrow()
    }

    fn subscribe(&self) -> BoxStream<'static, bool> {
        self.ensure_started();
        watch_stream_until(self.tx.subscribe(), self.stop.subscribe())
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// ManualConnectivity
// ============================================================================

/// Connectivity that only changes when told to.
pub struct ManualConnectivity {
    tx: watch::Sender<bool>,
}

impl ManualConnectivity {
    pub fn new(connected: bool) -> Self {
        let (tx, _rx) = watch::channel(connected);
        Self { tx }
    }

    pub fn set_connected(&self, connected: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }
}

impl ConnectivityMonitor for ManualConnectivity {
    fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> BoxStream<'static, bool> {
        watch_stream(self.tx.subscribe())
    }
}
