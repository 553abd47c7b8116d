//! Per-thread provider sessions.

use std::sync::{Mutex, PoisonError};

use rayon::ThreadPool;
use treesum_core::{ProviderError, ResourceProvider};

/// One lazily opened session per worker thread, plus one for the caller.
///
/// Slot `i` belongs to thread `i` of the engine's own pool; the last slot
/// belongs to any thread outside it, including workers of other pools. A
/// slot is only ever locked by its owning thread, so sessions are never
/// shared.
pub(crate) struct SessionPool<'p, S> {
    pool: &'p ThreadPool,
    slots: Vec<Mutex<Option<S>>>,
}

impl<'p, S> SessionPool<'p, S> {
    pub fn new(pool: &'p ThreadPool) -> Self {
        Self {
            pool,
            slots: (0..=pool.current_num_threads())
                .map(|_| Mutex::new(None))
                .collect(),
        }
    }

    /// Run `f` with the session of the current thread, connecting first if needed.
    pub fn with_session<P, R>(
        &self,
        provider: &P,
        f: impl FnOnce(&mut S) -> Result<R, ProviderError>,
    ) -> Result<R, ProviderError>
    where
        P: ResourceProvider<Session = S>,
    {
        let caller = self.slots.len() - 1;
        let index = self
            .pool
            .current_thread_index()
            .filter(|&index| index < caller)
            .unwrap_or(caller);
        let mut slot = self.slots[index].lock().unwrap_or_else(PoisonError::into_inner);
        let session = match &mut *slot {
            Some(session) => session,
            empty @ None => empty.insert(provider.connect()?),
        };
        f(session)
    }

    /// Number of sessions opened so far.
    pub fn opened(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }
}
