//! Cross-thread observation state for the middleware chain.
//!
//! # Responsibilities
//! - Record the last failure message seen by an inner observer layer
//! - Record whether the outermost observer received a valid response
//! - Hand both facts from the server worker thread to the test thread
//!
//! # Design Decisions
//! - A cloneable `Arc` handle instead of process globals; the reader joins
//!   the server thread before reading, so the join provides the
//!   happens-before edge and no further synchronization is needed beyond
//!   the `Mutex`/`AtomicBool` interior

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Shared observation state, written by middleware and read by the driver.
///
/// Lifecycle per scenario: [`reset`](Probe::reset) → populate during one
/// request → assert → discard.
#[derive(Clone, Debug, Default)]
pub struct Probe {
    inner: Arc<ProbeShared>,
}

#[derive(Debug, Default)]
struct ProbeShared {
    error_encountered: Mutex<Option<String>>,
    error_handled: AtomicBool,
}

impl Probe {
    /// Create a fresh probe with both flags cleared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both flags before a scenario.
    pub fn reset(&self) {
        let mut slot = self
            .inner
            .error_encountered
            .lock()
            .expect("probe mutex poisoned");
        *slot = None;
        self.inner.error_handled.store(false, Ordering::SeqCst);
    }

    /// Record a failure message observed while forwarding a request.
    pub fn record_error(&self, message: &str) {
        let mut slot = self
            .inner
            .error_encountered
            .lock()
            .expect("probe mutex poisoned");
        *slot = Some(message.to_string());
    }

    /// Record that the outermost observer received and validated a response.
    pub fn mark_handled(&self) {
        self.inner.error_handled.store(true, Ordering::SeqCst);
    }

    /// Last failure message captured, if any.
    pub fn error_encountered(&self) -> Option<String> {
        self.inner
            .error_encountered
            .lock()
            .expect("probe mutex poisoned")
            .clone()
    }

    /// Whether the outermost observer saw a valid response.
    pub fn error_handled(&self) -> bool {
        self.inner.error_handled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_cleared() {
        let probe = Probe::new();
        assert_eq!(probe.error_encountered(), None);
        assert!(!probe.error_handled());
    }

    #[test]
    fn populate_then_reset() {
        let probe = Probe::new();
        probe.record_error("No response returned.");
        probe.mark_handled();
        assert_eq!(
            probe.error_encountered().as_deref(),
            Some("No response returned.")
        );
        assert!(probe.error_handled());

        probe.reset();
        assert_eq!(probe.error_encountered(), None);
        assert!(!probe.error_handled());
    }

    #[test]
    fn clones_share_state() {
        let probe = Probe::new();
        let writer = probe.clone();
        writer.record_error("boom");
        assert_eq!(probe.error_encountered().as_deref(), Some("boom"));
    }
}
