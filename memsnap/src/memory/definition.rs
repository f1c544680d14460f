use crate::memory::{AliasSet, MemoryIndex};
use crate::value::ObjectValue;
use std::collections::BTreeSet;
use std::sync::Arc;

/// The members an index owns while it holds an array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArrayDescriptor {
    pub members: BTreeSet<MemoryIndex>,
}

/// Structure metadata for one index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexDefinition {
    pub aliases: AliasSet,
    /// Present exactly when the index's entry holds its own array value.
    pub array: Option<ArrayDescriptor>,
    /// The objects the index's entry may reference.
    pub objects: BTreeSet<ObjectValue>,
}

impl IndexDefinition {
    pub fn has_array(&self) -> bool {
        self.array.is_some()
    }

    pub fn members(&self) -> impl Iterator<Item = &MemoryIndex> {
        self.array.iter().flat_map(|a| a.members.iter())
    }
}

/// Shape of one abstract object: its class and the fields written so far.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectDescriptor {
    pub class: Arc<str>,
    pub fields: BTreeSet<MemoryIndex>,
}

impl ObjectDescriptor {
    pub fn new(class: Arc<str>) -> Self {
        Self {
            class,
            fields: BTreeSet::new(),
        }
    }
}
