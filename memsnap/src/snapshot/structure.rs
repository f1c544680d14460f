use crate::memory::{AliasSet, IndexDefinition, MemoryIndex, ObjectDescriptor};
use crate::value::ObjectId;
use std::collections::BTreeMap;

/// Which indices exist, how they are shaped and how they alias.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStructure {
    pub(crate) definitions: BTreeMap<MemoryIndex, IndexDefinition>,
    pub(crate) objects: BTreeMap<ObjectId, ObjectDescriptor>,
    pub(crate) call_level: usize,
}

impl SnapshotStructure {
    pub fn definition(&self, index: &MemoryIndex) -> Option<&IndexDefinition> {
        self.definitions.get(index)
    }

    pub fn contains(&self, index: &MemoryIndex) -> bool {
        self.definitions.contains_key(index)
    }

    pub fn indices(&self) -> impl Iterator<Item = &MemoryIndex> {
        self.definitions.keys()
    }

    pub fn aliases(&self, index: &MemoryIndex) -> Option<&AliasSet> {
        self.definitions
            .get(index)
            .map(|d| &d.aliases)
            .filter(|a| !a.is_empty())
    }

    pub fn object(&self, id: &ObjectId) -> Option<&ObjectDescriptor> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &ObjectDescriptor)> {
        self.objects.iter()
    }

    pub fn call_level(&self) -> usize {
        self.call_level
    }
}
