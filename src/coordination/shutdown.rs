//! Cooperative stop flag
//!
//! The scanner checks the flag at the top of each cycle and sleeps through
//! `StopFlag::sleep`, which wakes early on a stop request. A cycle that is
//! already scanning events always runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};

/// Why the scanner was asked to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT / SIGTERM
    Signal,
    /// `--duration` elapsed
    DurationElapsed,
    /// Requested from code (tests, burst end)
    Requested,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Signal => write!(f, "signal"),
            StopReason::DurationElapsed => write!(f, "duration_elapsed"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

#[derive(Debug, Default)]
pub struct StopFlag {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Request a stop; later requests are ignored
    pub fn request_stop(&self, reason: StopReason) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            warn!("Stop already requested, ignoring duplicate: {}", reason);
            return;
        }
        info!("Stop requested: {}", reason);
        self.notify.notify_waiters();
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` when the full duration elapsed without a stop.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_stopped() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_stopped(),
            _ = notified => false,
        }
    }

    /// Wait until a stop is requested
    pub async fn wait(&self) {
        while self.sleep(Duration::from_secs(3600)).await {}
    }

    /// Stop on Ctrl-C / SIGTERM
    pub fn install_signal_handler(self: &Arc<Self>) {
        let flag = Arc::clone(self);
        tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                match signal(SignalKind::terminate()) {
                    Ok(mut term) => {
                        tokio::select! {
                            _ = tokio::signal::ctrl_c() => {}
                            _ = term.recv() => {}
                        }
                    }
                    Err(e) => {
                        warn!("SIGTERM handler unavailable: {}", e);
                        let _ = tokio::signal::ctrl_c().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
            flag.request_stop(StopReason::Signal);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_stop() {
        let flag = StopFlag::new();
        assert!(flag.sleep(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_stop_interrupts_sleep() {
        let flag = StopFlag::new();
        let waiter = Arc::clone(&flag);
        let handle = tokio::spawn(async move { waiter.sleep(Duration::from_secs(30)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        flag.request_stop(StopReason::Requested);

        let completed = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!completed);
        assert!(flag.is_stopped());
    }

    #[tokio::test]
    async fn test_sleep_after_stop_returns_immediately() {
        let flag = StopFlag::new();
        flag.request_stop(StopReason::DurationElapsed);
        assert!(!flag.sleep(Duration::from_secs(30)).await);
        flag.wait().await;
    }

    #[test]
    fn test_duplicate_stop_keeps_flag_set() {
        let flag = StopFlag::new();
        flag.request_stop(StopReason::Signal);
        flag.request_stop(StopReason::Requested);
        tokio_test::block_on(flag.wait());
        assert!(flag.is_stopped());
    }
}
