use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, error::Elapsed, timeout_at};

/// A per-request cutoff for store and cache I/O.
///
/// Created once when a handler starts and shared by every call it makes, so
/// the whole request, not each call, is bounded by the configured timeout.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Run `fut` until it finishes or the deadline passes, whichever is first.
    /// On expiry the future is dropped.
    pub async fn bound<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        timeout_at(self.at, fut).await
    }
}
