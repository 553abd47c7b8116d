//! Observers of a checksum computation.

use tracing::{debug, info, warn};
use treesum_core::ChecksumError;

/// Receives notifications while a computation runs.
///
/// Methods are called synchronously, possibly from worker threads. A
/// listener only observes; nothing it does changes the outcome.
pub trait ChecksumListener: Sync {
    /// Discovery is about to start.
    fn on_start(&self) {}

    /// Hashing completion in percent, never decreasing.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Every file was hashed successfully.
    fn on_done(&self) {}

    /// A task failed. Called for every error, not only the first one.
    fn on_error(&self, error: &ChecksumError) {
        let _ = error;
    }

    /// Free-form diagnostic message.
    fn on_debug(&self, message: &str) {
        let _ = message;
    }
}

/// Listener ignoring every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl ChecksumListener for NoopListener {}

/// Listener forwarding notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl ChecksumListener for TracingListener {
    fn on_start(&self) {
        info!("checksum computation started");
    }

    fn on_progress(&self, percent: u8) {
        debug!(percent, "hashing progress");
    }

    fn on_done(&self) {
        info!("checksum computation done");
    }

    fn on_error(&self, error: &ChecksumError) {
        warn!(%error, "checksum computation failed");
    }

    fn on_debug(&self, message: &str) {
        debug!("{message}");
    }
}

impl<L: ChecksumListener + ?Sized> ChecksumListener for &L {
    fn on_start(&self) {
        (**self).on_start();
    }

    fn on_progress(&self, percent: u8) {
        (**self).on_progress(percent);
    }

    fn on_done(&self) {
        (**self).on_done();
    }

    fn on_error(&self, error: &ChecksumError) {
        (**self).on_error(error);
    }

    fn on_debug(&self, message: &str) {
        (**self).on_debug(message);
    }
}
