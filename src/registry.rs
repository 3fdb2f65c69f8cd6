//! Run-scoped set of message names already emitted.
//!
//! Keyed purely on the derived name: two structurally different composites
//! that derive the same name collide, and the first one emitted wins.
use indexmap::IndexSet;

#[derive(Debug, Clone, Default)]
pub struct DedupRegistry {
    names: IndexSet<String>,
}

/// Registry length at some point in a run; see [`DedupRegistry::rollback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl DedupRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn contains(&self, name: &str) -> bool { self.names.contains(name) }

    /// Returns `false` when the name was already registered.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize { self.names.len() }
    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    pub fn checkpoint(&self) -> Checkpoint { Checkpoint(self.names.len()) }

    /// Forgets every name registered after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.names.truncate(checkpoint.0);
    }
}
