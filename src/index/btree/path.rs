//! Root-to-leaf descent path.

use crate::common::PageId;

/// An internal page visited during descent and the child slot taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathEntry {
    pub page: PageId,
    pub slot: usize,
}

/// Stack of internal pages from the root down to a leaf's parent.
///
/// Owned by the caller of a descent, so split propagation can walk back up
/// without parent pointers in the pages.
#[derive(Debug, Default, Clone)]
pub struct PathStack {
    entries: Vec<PathEntry>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, page: PageId, slot: usize) {
        self.entries.push(PathEntry { page, slot });
    }

    pub fn pop(&mut self) -> Option<PathEntry> {
        self.entries.pop()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from the root down.
    pub fn iter(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }
}
