//! Cooperative cancellation
//!
//! The crawl loop polls [`ShutdownSignal::is_requested`] at page and item
//! boundaries. The first interrupt asks for a graceful pause; a second one
//! terminates the process immediately, accepting that the in-flight page
//! is lost.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Exit status used when the operator forces termination
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared interrupt counter; clones observe the same requests
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    interrupts: Arc<AtomicUsize>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one shutdown request and returns how many have been made
    pub fn request(&self) -> usize {
        self.interrupts.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns true once any shutdown has been requested
    pub fn is_requested(&self) -> bool {
        self.interrupt_count() > 0
    }

    pub fn interrupt_count(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Spawns a task that turns Ctrl+C into shutdown requests
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_for_interrupts(&self) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Cannot listen for interrupts: {}", e);
                    return;
                }

                if signal.request() == 1 {
                    tracing::warn!(
                        "Interrupt received: finishing the current page and saving the checkpoint. \
                         Press Ctrl+C again to quit immediately (the current page will be lost)"
                    );
                } else {
                    tracing::error!("Second interrupt received, exiting immediately");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        })
    }
}
