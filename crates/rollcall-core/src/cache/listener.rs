// ── Cache change listeners ──

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Weak;

use crate::model::Record;

use super::CacheInner;

/// What happened to a collection's cached snapshot.
#[derive(Debug, Clone, Copy)]
pub enum CacheEvent<'a> {
    /// A new snapshot is in place (fetched or optimistically mutated).
    Updated(&'a [Record]),
    /// The snapshot was dropped; the next read refetches.
    Invalidated,
}

/// Callback invoked synchronously on every change to one collection.
pub type Listener = std::sync::Arc<dyn Fn(&CacheEvent<'_>) + Send + Sync>;

/// Registration returned by [`QueryCache::add_listener`](super::QueryCache::add_listener).
///
/// Dropping the handle leaves the listener registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct ListenerHandle {
    pub(super) cache: Weak<CacheInner>,
    pub(super) collection: String,
    pub(super) id: u64,
}

impl ListenerHandle {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Remove the listener. A no-op if the cache is already gone.
    pub fn unsubscribe(self) {
        let Some(cache) = self.cache.upgrade() else {
            return;
        };
        if let Some(mut registered) = cache.listeners.get_mut(&self.collection) {
            registered.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Run every listener in registration order. Panics are caught and logged.
pub(super) fn dispatch(listeners: &[Listener], collection: &str, event: &CacheEvent<'_>) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
            tracing::warn!(collection, "cache listener panicked");
        }
    }
}
