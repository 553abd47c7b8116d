//! Tracking of in-flight directory listings.

use dashmap::DashSet;
use treesum_core::ResourceId;

/// Set of directories whose listing has been submitted but not finished.
///
/// Used during parallel discovery. Completion itself is detected by the
/// enclosing pool scope; this set answers "what is still running" for
/// progress and diagnostics.
#[derive(Debug, Default)]
pub struct PendingListings {
    pending: DashSet<ResourceId>,
}

impl PendingListings {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            pending: DashSet::new(),
        }
    }

    /// Mark a directory as submitted. Returns `false` if it was already pending.
    pub fn submit(&self, id: ResourceId) -> bool {
        self.pending.insert(id)
    }

    /// Mark a directory listing as finished.
    pub fn finish(&self, id: ResourceId) {
        self.pending.remove(&id);
    }

    /// Check if a directory listing is in flight.
    pub fn contains(&self, id: ResourceId) -> bool {
        self.pending.contains(&id)
    }

    /// Number of listings in flight.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no listing is in flight.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
