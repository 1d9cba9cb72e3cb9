//! Cooperative interruption
//!
//! SIGINT/SIGTERM only raise a flag. The process runner kills interruptible
//! children when it sees the flag, waits observe it, and the orchestrator
//! stops before the next stack, so the active stack still gets its teardown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared interrupt flag
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    raised: Arc<AtomicBool>,
}

impl Interrupt {
    /// Creates a flag that is not raised
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Returns true once the flag has been raised
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Blocks for `duration` unless the flag is raised first
    ///
    /// Returns `false` if the wait was cut short.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }

    /// Spawns a thread that raises the flag on SIGINT or SIGTERM
    ///
    /// A second Ctrl+C exits immediately with status 130.
    pub fn watch_signals(&self) -> std::io::Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let interrupt = self.clone();

        std::thread::Builder::new()
            .name("signal-watcher".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let ctrl_c = async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
                            std::future::pending::<()>().await;
                        }
                    };

                    #[cfg(unix)]
                    let terminate = async {
                        use tokio::signal::unix::{SignalKind, signal};
                        match signal(SignalKind::terminate()) {
                            Ok(mut stream) => {
                                stream.recv().await;
                            }
                            Err(e) => {
                                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                                std::future::pending::<()>().await;
                            }
                        }
                    };

                    #[cfg(not(unix))]
                    let terminate = std::future::pending::<()>();

                    tokio::select! {
                        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C)"),
                        () = terminate => tracing::info!("Received SIGTERM"),
                    }

                    interrupt.raise();
                    eprintln!(
                        "Interrupted: tearing down the active stack (press Ctrl+C again to abort)"
                    );

                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("Aborted: the active stack may still be running");
                        std::process::exit(130);
                    }
                });
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let interrupt = Interrupt::new();
        let clone = interrupt.clone();
        assert!(!clone.is_raised());

        interrupt.raise();
        assert!(clone.is_raised());
    }

    #[test]
    fn test_sleep_completes() {
        let interrupt = Interrupt::new();
        assert!(interrupt.sleep(Duration::from_millis(20)));
        assert!(interrupt.sleep(Duration::ZERO));
    }

    #[test]
    fn test_sleep_is_cut_short() {
        let interrupt = Interrupt::new();
        let raiser = interrupt.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            raiser.raise();
        });

        let start = Instant::now();
        assert!(!interrupt.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
