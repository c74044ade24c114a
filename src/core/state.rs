//! Process-wide run state.
//!
//! - `WATCHING`: is the watch task running? (decides what Ctrl+C does)
//! - [`ShutdownToken`]: cancellation shared by the scheduler and the watch task

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Watch task is running (servers bound, workers alive)
static WATCHING: AtomicBool = AtomicBool::new(false);

/// Check if the watch task is running
pub fn is_watching() -> bool {
    WATCHING.load(Ordering::SeqCst)
}

/// Mark the watch task as started or stopped
pub fn set_watching(watching: bool) {
    WATCHING.store(watching, Ordering::SeqCst);
}

/// Cloneable cancellation token.
///
/// Triggering is idempotent. Every clone observes the same state, and
/// [`cancelled`](Self::cancelled) resolves immediately once triggered.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until shutdown is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Sender is owned by self, so the channel cannot close while we wait
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

/// Install the Ctrl+C handler. Call once at program start.
///
/// - While watching: trigger the token, the watch task winds down its
///   servers and workers and the scheduler returns normally
/// - Otherwise: exit immediately, there is nothing to shut down gracefully
pub fn setup_shutdown_handler(token: ShutdownToken) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        if is_watching() {
            crate::log!("serve"; "shutting down...");
            token.trigger();
        } else {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}
