use std::collections::HashMap;

use crate::models::RunningKind;

/// Open messages keyed by `(page, kind)`, stored as indices into the message list.
///
/// Holds at most one entry per key.
#[derive(Debug, Default, Clone)]
pub struct RunningIndex {
    open: HashMap<(String, RunningKind), usize>,
}

impl RunningIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, page: &str, kind: RunningKind) -> Option<usize> {
        self.open.get(&(page.to_string(), kind)).copied()
    }

    /// Record `index` as the open message for the key, returning the one it replaces.
    pub fn insert(&mut self, page: &str, kind: RunningKind, index: usize) -> Option<usize> {
        self.open.insert((page.to_string(), kind), index)
    }

    pub fn remove(&mut self, page: &str, kind: RunningKind) -> Option<usize> {
        self.open.remove(&(page.to_string(), kind))
    }

    /// Drop whichever entry points at `index`.
    pub fn release(&mut self, index: usize) {
        self.open.retain(|_, open| *open != index);
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
