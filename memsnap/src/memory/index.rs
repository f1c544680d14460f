use crate::value::ObjectId;
use internment::Intern;
use memsnap_cfg::{IndexKey, PathSegment};
use std::cmp::Ordering;
use std::sync::Arc;

/// Which variable table a root variable lives in. Locals carry the call level
/// of their frame; level 0 is the script's top level, whose locals are globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableScope {
    Global,
    Local(usize),
}

impl VariableScope {
    pub fn at_level(level: usize) -> Self {
        match level {
            0 => VariableScope::Global,
            l => VariableScope::Local(l),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexSegment {
    Key(IndexKey),
    /// Stands for every key not otherwise present.
    UnknownKey,
    Field(Arc<str>),
    /// Stands for every field not otherwise present.
    UnknownField,
}

impl IndexSegment {
    pub fn is_unknown(&self) -> bool {
        matches!(self, IndexSegment::UnknownKey | IndexSegment::UnknownField)
    }

    pub fn is_field(&self) -> bool {
        matches!(self, IndexSegment::Field(_) | IndexSegment::UnknownField)
    }
}

impl From<&PathSegment> for IndexSegment {
    fn from(value: &PathSegment) -> Self {
        match value {
            PathSegment::Key(k) => IndexSegment::Key(k.clone()),
            PathSegment::UnknownKey => IndexSegment::UnknownKey,
            PathSegment::Field(f) => IndexSegment::Field(Arc::from(f.as_str())),
            PathSegment::UnknownField => IndexSegment::UnknownField,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexNode {
    Variable { name: Arc<str>, scope: VariableScope },
    /// Reserved slots that are not program variables.
    Control { name: Arc<str> },
    /// The return value of the function running at `level`.
    Return { level: usize },
    /// The root below which an object's fields live.
    Object(ObjectId),
    Member {
        parent: MemoryIndex,
        segment: IndexSegment,
    },
}

/// An interned storage location. Copying and comparing for equality are
/// pointer operations; ordering is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryIndex(Intern<IndexNode>);

impl PartialOrd for MemoryIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemoryIndex {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            return Ordering::Equal;
        }
        self.0.as_ref().cmp(other.0.as_ref())
    }
}

const DIAGNOSTICS: &str = "diagnostics";
const FRESH_ARRAY: &str = "fresh-array";

impl MemoryIndex {
    pub fn new(node: IndexNode) -> Self {
        Self(Intern::new(node))
    }

    pub fn variable<S: AsRef<str>>(name: S, scope: VariableScope) -> Self {
        Self::new(IndexNode::Variable {
            name: Arc::from(name.as_ref()),
            scope,
        })
    }

    pub fn global<S: AsRef<str>>(name: S) -> Self {
        Self::variable(name, VariableScope::Global)
    }

    pub fn control<S: AsRef<str>>(name: S) -> Self {
        Self::new(IndexNode::Control {
            name: Arc::from(name.as_ref()),
        })
    }

    /// The reserved slot analysis findings are written to.
    pub fn diagnostics() -> Self {
        Self::control(DIAGNOSTICS)
    }

    /// A reserved slot that never owns members. Storing an array value owned
    /// by it produces an empty array at the target.
    pub fn fresh_array() -> Self {
        Self::control(FRESH_ARRAY)
    }

    pub fn return_slot(level: usize) -> Self {
        Self::new(IndexNode::Return { level })
    }

    pub fn object(id: ObjectId) -> Self {
        Self::new(IndexNode::Object(id))
    }

    pub fn member(self, segment: IndexSegment) -> Self {
        Self::new(IndexNode::Member {
            parent: self,
            segment,
        })
    }

    pub fn key<K: Into<IndexKey>>(self, key: K) -> Self {
        self.member(IndexSegment::Key(key.into()))
    }

    pub fn field<S: AsRef<str>>(self, name: S) -> Self {
        self.member(IndexSegment::Field(Arc::from(name.as_ref())))
    }

    pub fn node(&self) -> &IndexNode {
        self.0.as_ref()
    }

    pub fn parent(&self) -> Option<MemoryIndex> {
        match self.node() {
            IndexNode::Member { parent, .. } => Some(*parent),
            _ => None,
        }
    }

    pub fn segment(&self) -> Option<&IndexSegment> {
        match self.node() {
            IndexNode::Member { segment, .. } => Some(segment),
            _ => None,
        }
    }

    /// The index this one hangs below, after following every member step.
    pub fn root(&self) -> MemoryIndex {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// True for indices that belong to the frame of call level `level`.
    pub fn is_rooted_at_level(&self, level: usize) -> bool {
        match self.root().node() {
            IndexNode::Variable {
                scope: VariableScope::Local(l),
                ..
            } => *l == level,
            IndexNode::Return { level: l } => *l == level,
            _ => false,
        }
    }

    pub fn is_unknown_member(&self) -> bool {
        self.segment().is_some_and(IndexSegment::is_unknown)
    }

    pub fn is_ancestor_of(&self, other: &MemoryIndex) -> bool {
        let mut current = other.parent();
        while let Some(parent) = current {
            if parent == *self {
                return true;
            }
            current = parent.parent();
        }
        false
    }
}
