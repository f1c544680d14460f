use crate::memory::{MemoryEntry, MemoryIndex};
use std::collections::BTreeMap;

/// The value set stored at every defined index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotData {
    pub(crate) entries: BTreeMap<MemoryIndex, MemoryEntry>,
}

impl SnapshotData {
    pub fn entry(&self, index: &MemoryIndex) -> Option<&MemoryEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemoryIndex, &MemoryEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
