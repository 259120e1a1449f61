//! Hot store for the active lookup structure.
//!
//! The store is a single `ArcSwapOption` slot. Readers clone the current
//! `Arc` without locking; the refresh scheduler is the only writer.
//!
//! Disposal is reference counted. [`HotStore::swap`] returns the displaced
//! handle to the writer, and dropping it releases the structure only after
//! every lookup that captured it through [`HotStore::get`] has finished.

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Single-slot holder of the currently installed structure.
pub struct HotStore<S> {
    current: ArcSwapOption<S>,
    /// Number of swaps that installed a structure
    generation: AtomicU64,
}

impl<S> HotStore<S> {
    /// Create an empty store. [`get`](Self::get) returns `None` until the
    /// first swap.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a store that already holds `structure`.
    pub fn with_structure(structure: S) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(structure),
            generation: AtomicU64::new(1),
        }
    }

    /// Current structure, or `None` when nothing is installed yet.
    ///
    /// The returned handle stays valid for as long as the caller holds it,
    /// even if a swap happens meanwhile.
    pub fn get(&self) -> Option<Arc<S>> {
        self.current.load_full()
    }

    /// Install `new` and return the previous occupant.
    ///
    /// Dropping the returned handle is the caller's disposal step.
    pub fn swap(&self, new: Arc<S>) -> Option<Arc<S>> {
        let old = self.current.swap(Some(new));
        self.generation.fetch_add(1, Ordering::SeqCst);
        old
    }

    /// Empty the store, returning the last occupant.
    pub fn take(&self) -> Option<Arc<S>> {
        self.current.swap(None)
    }

    /// Whether a structure is installed.
    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of structures installed so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl<S> Default for HotStore<S> {
    fn default() -> Self {
        Self::new()
    }
}
