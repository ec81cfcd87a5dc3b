use crate::decoration::{ChangeSet, DecorationSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Reactive cell holding the active decoration set.
///
/// Sets are only ever swapped whole. Every pipeline cycle takes a generation
/// number up front and may commit only while it is still the latest one, so
/// a slow cycle finishing late cannot overwrite a newer result.
pub struct DecorationStore {
    current: watch::Sender<Arc<DecorationSet>>,
    issued: AtomicU64,
    versions: AtomicU64,
}

impl Default for DecorationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DecorationStore {
    pub fn new() -> Self {
        let (current, _) = watch::channel(Arc::new(DecorationSet::empty()));
        Self {
            current,
            issued: AtomicU64::new(0),
            versions: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> Arc<DecorationSet> {
        Arc::clone(&self.current.borrow())
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_empty()
    }

    /// Receiver for the rendering layer; wakes on every replacement or remap.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DecorationSet>> {
        self.current.subscribe()
    }

    pub fn issue_generation(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_generation(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Replaces the set if `generation` is still the latest issued.
    pub fn commit(&self, generation: u64, set: DecorationSet) -> bool {
        self.current.send_if_modified(move |current| {
            if generation != self.issued.load(Ordering::SeqCst) {
                return false;
            }
            let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
            *current = Arc::new(set.with_version(version));
            true
        })
    }

    /// Replaces the set unconditionally.
    pub fn replace(&self, set: DecorationSet) {
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.send_replace(Arc::new(set.with_version(version)));
    }

    /// Remaps entry positions through a document edit.
    pub fn apply_changes(&self, changes: &ChangeSet) {
        if changes.is_empty() {
            return;
        }
        self.current.send_if_modified(|current| {
            if current.is_empty() {
                return false;
            }
            *current = Arc::new(current.map(changes));
            true
        });
        debug!("Remapped decorations through document edit");
    }
}
