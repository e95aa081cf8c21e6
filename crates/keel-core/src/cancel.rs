//! Cooperative cancellation.
//!
//! Long-running computations (Monte Carlo batches, frontier sweeps) receive a
//! [`CancellationToken`] and check it between units of work. A cancelled
//! computation returns [`AnalyticsError::Cancelled`] and never a partial result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{AnalyticsError, AnalyticsResult};

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a caller can keep one handle and pass
/// another into a computation running on a worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            log::debug!("cancellation requested");
        }
    }

    /// Returns true once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self, operation: &str) -> AnalyticsResult<()> {
        if self.is_cancelled() {
            Err(AnalyticsError::cancelled(operation))
        } else {
            Ok(())
        }
    }
}
