//! Checksum progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

/// Phase of a checksum computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Building the resource tree.
    Discovery,
    /// Hashing file content.
    Hashing,
    /// All files hashed.
    Done,
}

/// Progress information during a computation.
#[derive(Debug, Clone)]
pub struct ChecksumProgress {
    /// Current phase.
    pub phase: Phase,
    /// Number of files discovered so far.
    pub files_found: u64,
    /// Number of files hashed so far.
    pub files_hashed: u64,
    /// Total content bytes digested so far.
    pub bytes_hashed: u64,
    /// Directory listings still in flight.
    pub listings_pending: usize,
    /// Time elapsed since the computation started.
    pub elapsed: Duration,
}

impl ChecksumProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            phase: Phase::Discovery,
            files_found: 0,
            files_hashed: 0,
            bytes_hashed: 0,
            listings_pending: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Hashing completion in percent, `completed * 100 / found`.
    pub fn percent(&self) -> u8 {
        percent(self.files_hashed, self.files_found)
    }

    /// Calculate hashing rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate hashing rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_hashed as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

impl Default for ChecksumProgress {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn percent(completed: u64, total: u64) -> u8 {
    if total == 0 {
        100
    } else {
        (completed.min(total) * 100 / total) as u8
    }
}

/// Shared progress counters of one computation.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    files_found: AtomicU64,
    files_hashed: AtomicU64,
    bytes_hashed: AtomicU64,
    last_percent: Mutex<Option<u8>>,
    tx: broadcast::Sender<ChecksumProgress>,
}

impl ProgressTracker {
    pub fn new(tx: broadcast::Sender<ChecksumProgress>) -> Self {
        Self {
            start_time: Instant::now(),
            files_found: AtomicU64::new(0),
            files_hashed: AtomicU64::new(0),
            bytes_hashed: AtomicU64::new(0),
            last_percent: Mutex::new(None),
            tx,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn record_found(&self, files: u64) {
        self.files_found.fetch_add(files, Ordering::Relaxed);
    }

    pub fn set_found(&self, files: u64) {
        self.files_found.store(files, Ordering::Relaxed);
    }

    /// Record one hashed file and return the number of files hashed so far.
    pub fn record_hashed(&self, bytes: u64) -> u64 {
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
        self.files_hashed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed.load(Ordering::Relaxed)
    }

    /// Run `report` with the current completion percentage if it did not
    /// go backwards since the last report. Reports are serialized.
    pub fn report_percent(&self, report: impl FnOnce(u8)) {
        let mut last = self.last_percent.lock().unwrap_or_else(PoisonError::into_inner);
        let current = percent(
            self.files_hashed.load(Ordering::Acquire),
            self.files_found.load(Ordering::Relaxed),
        );
        if last.is_none_or(|last| current >= last) {
            *last = Some(current);
            report(current);
        }
    }

    pub fn snapshot(&self, phase: Phase, listings_pending: usize) -> ChecksumProgress {
        ChecksumProgress {
            phase,
            files_found: self.files_found.load(Ordering::Relaxed),
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            listings_pending,
            elapsed: self.start_time.elapsed(),
        }
    }

    /// Broadcast a snapshot to subscribers, if any.
    pub fn publish(&self, phase: Phase, listings_pending: usize) {
        let _ = self.tx.send(self.snapshot(phase, listings_pending));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn test_reported_percent_never_decreases() {
        let (tx, _) = broadcast::channel(4);
        let tracker = ProgressTracker::new(tx);
        tracker.set_found(4);

        let mut reported = Vec::new();
        tracker.report_percent(|p| reported.push(p));
        tracker.record_hashed(10);
        tracker.record_hashed(10);
        tracker.report_percent(|p| reported.push(p));
        tracker.report_percent(|p| reported.push(p));
        assert_eq!(reported, vec![0, 50, 50]);

        let progress = tracker.snapshot(Phase::Hashing, 0);
        assert_eq!(progress.bytes_hashed, 20);
        assert_eq!(progress.percent(), 50);
    }
}
