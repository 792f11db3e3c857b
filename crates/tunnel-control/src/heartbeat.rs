//! Self-resetting heartbeat watchdog. Every control socket (client and
//! server) arms one of these for `HeartbeatTimeout`; each received
//! heartbeat calls [`HeartbeatWatchdog::reset`], and if the timer ever
//! fires uninterrupted the registered `on_expire` closure runs — closing
//! the control socket and every listener it owns, which cascades
//! closure across that service's sibling tasks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;

type ExpireFn = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

pub struct HeartbeatWatchdog {
    reset_tx: mpsc::Sender<()>,
}

impl HeartbeatWatchdog {
    /// Spawn the watchdog task. `on_expire` runs once, the first time
    /// `timeout` elapses without an intervening [`reset`](Self::reset).
    pub fn spawn<F, Fut>(timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (reset_tx, mut reset_rx) = mpsc::channel(1);
        let on_expire: ExpireFn = Box::new(move || Box::pin(on_expire()));

        tokio::spawn(async move {
            let mut on_expire = Some(on_expire);
            loop {
                match tokio::time::timeout(timeout, reset_rx.recv()).await {
                    Ok(Some(())) => continue,
                    Ok(None) => return,
                    Err(_elapsed) => {
                        tracing::warn!(?timeout, "HEARTBEAT_TIMEOUT");
                        if let Some(f) = on_expire.take() {
                            f().await;
                        }
                        return;
                    }
                }
            }
        });

        Self { reset_tx }
    }

    /// Notify the watchdog that a heartbeat was received, restarting the
    /// timeout window. A full channel (a reset already pending) is not
    /// an error — the timer is about to restart anyway.
    pub fn reset(&self) {
        let _ = self.reset_tx.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn fires_after_timeout_with_no_reset() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let _watchdog = HeartbeatWatchdog::spawn(Duration::from_millis(50), move || {
            async move {
                fired2.store(true, Ordering::SeqCst);
            }
        });

        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_postpones_expiry() {
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let watchdog = HeartbeatWatchdog::spawn(Duration::from_millis(50), move || {
            async move {
                fired2.store(true, Ordering::SeqCst);
            }
        });

        tokio::time::advance(Duration::from_millis(30)).await;
        watchdog.reset();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(30)).await;
        tokio::task::yield_now().await;
        assert!(!fired.load(Ordering::SeqCst));
    }
}
