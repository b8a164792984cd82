//! In-flight request accounting for teardown.
//!
//! Detached middleware chains may still be writing probe state a moment
//! after the connection that spawned them has died. Teardown therefore
//! cannot just stop accepting and exit; it has to wait until every
//! [`DrainPermit`] minted for in-flight work has been dropped.
//!
//! Only permits count. The [`Drain`] handle itself can be cloned into
//! services and idle connection tasks freely without delaying teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct DrainShared {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Handle for minting per-request permits.
#[derive(Clone, Debug)]
pub struct Drain {
    shared: Arc<DrainShared>,
}

impl Drain {
    /// Mint a permit for one unit of in-flight work.
    pub fn permit(&self) -> DrainPermit {
        self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
        DrainPermit {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// RAII guard for one unit of in-flight work.
#[derive(Debug)]
pub struct DrainPermit {
    shared: Arc<DrainShared>,
}

impl Drop for DrainPermit {
    fn drop(&mut self) {
        // notify_one stores a wakeup even when the barrier is not yet
        // waiting, so the idle transition is never missed.
        if self.shared.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.shared.idle.notify_one();
        }
    }
}

/// Waits until no permits remain.
#[derive(Debug)]
pub struct DrainBarrier {
    shared: Arc<DrainShared>,
}

/// Create a connected permit-minting handle and barrier.
pub fn drain_pair() -> (Drain, DrainBarrier) {
    let shared = Arc::new(DrainShared::default());
    (
        Drain {
            shared: Arc::clone(&shared),
        },
        DrainBarrier { shared },
    )
}

impl DrainBarrier {
    /// Wait until every permit has dropped, up to `timeout`.
    ///
    /// Resolves immediately when nothing is in flight. Returns false if
    /// work was still running at the deadline.
    pub async fn wait(self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                self.shared.idle.notified().await;
            }
        })
        .await
        .is_ok()
    }
}
