use serde::{Deserialize, Serialize};

/// Which variable table a [`MemoryPath`] starts from.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Scope {
    /// The global variable table.
    Global,
    /// The variable table of the currently executing function. At the top level
    /// of a script this is the global table.
    Local,
}

/// A statically known array key.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum IndexKey {
    Integer(i64),
    String(String),
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        IndexKey::Integer(value)
    }
}

impl From<i32> for IndexKey {
    fn from(value: i32) -> Self {
        IndexKey::Integer(value.into())
    }
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        IndexKey::String(value.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        IndexKey::String(value)
    }
}

/// One step of a [`MemoryPath`] below its root variable.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum PathSegment {
    /// `[key]` with a key known to the front-end.
    Key(IndexKey),
    /// `[$expr]` where the key is not statically known.
    UnknownKey,
    /// `->name`
    Field(String),
    /// `->$expr` where the field name is not statically known.
    UnknownField,
}

impl PathSegment {
    pub fn is_unknown(&self) -> bool {
        matches!(self, PathSegment::UnknownKey | PathSegment::UnknownField)
    }

    pub fn is_field(&self) -> bool {
        matches!(self, PathSegment::Field(_) | PathSegment::UnknownField)
    }
}

/// An access path as produced by the front-end: a root variable followed by any
/// number of array-key and field segments, e.g. `$a[1]->f`.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct MemoryPath {
    pub scope: Scope,
    pub name: String,
    pub segments: Vec<PathSegment>,
}

impl MemoryPath {
    pub fn new<S: Into<String>>(scope: Scope, name: S) -> Self {
        Self {
            scope,
            name: name.into(),
            segments: vec![],
        }
    }

    /// A variable of the current function (or the global table at the top level).
    pub fn local<S: Into<String>>(name: S) -> Self {
        Self::new(Scope::Local, name)
    }

    pub fn global<S: Into<String>>(name: S) -> Self {
        Self::new(Scope::Global, name)
    }

    pub fn segment(mut self, segment: PathSegment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn key<K: Into<IndexKey>>(self, key: K) -> Self {
        self.segment(PathSegment::Key(key.into()))
    }

    pub fn unknown_key(self) -> Self {
        self.segment(PathSegment::UnknownKey)
    }

    pub fn field<S: Into<String>>(self, name: S) -> Self {
        self.segment(PathSegment::Field(name.into()))
    }

    pub fn unknown_field(self) -> Self {
        self.segment(PathSegment::UnknownField)
    }

    /// True when the path names a bare variable.
    pub fn is_variable(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, if it has one.
    pub fn parent(&self) -> Option<MemoryPath> {
        if self.segments.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.segments.pop();
            Some(parent)
        }
    }
}
