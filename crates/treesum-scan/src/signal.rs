//! Cooperative cancellation shared by every task of a computation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use treesum_core::ChecksumError;

/// Abort flag, first error and deadline of a computation.
///
/// Tasks check the flag and the deadline before starting expensive work.
/// The first call to [`abort`](Self::abort) wins; its error becomes the
/// outcome of the computation.
#[derive(Debug)]
pub struct AbortSignal {
    aborted: AtomicBool,
    first_error: Mutex<Option<ChecksumError>>,
    deadline: Option<Instant>,
    limit: Duration,
}

impl AbortSignal {
    /// Create a signal that times out `limit` from now.
    pub fn new(limit: Duration) -> Self {
        Self {
            aborted: AtomicBool::new(false),
            first_error: Mutex::new(None),
            deadline: Instant::now().checked_add(limit),
            limit,
        }
    }

    /// Check whether the computation was aborted.
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    /// Check whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Configured wait ceiling.
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// Abort the computation. Returns `true` if this error is the first one.
    pub fn abort(&self, error: ChecksumError) -> bool {
        let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
        self.aborted.store(true, Ordering::Release);
        if slot.is_none() {
            *slot = Some(error);
            true
        } else {
            false
        }
    }

    /// Take the first error, leaving the signal aborted.
    pub fn take_error(&self) -> Option<ChecksumError> {
        self.first_error.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
