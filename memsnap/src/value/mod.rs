//! The value lattice: everything an abstract memory location may hold.

mod factory;
mod interval;
mod visitor;

pub use factory::ValueFactory;
pub use interval::{Bound, Interval};
pub use memsnap_cfg::ValueKind;
pub use visitor::ValueVisitor;

use crate::memory::MemoryIndex;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An `f64` with a total order, so floats can live in ordered value sets.
#[derive(Debug, Clone, Copy)]
pub struct F64(pub f64);

impl PartialEq for F64 {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for F64 {}

impl PartialOrd for F64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for F64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for F64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state)
    }
}

/// A concrete scalar literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scalar {
    Integer(i64),
    Float(F64),
    String(Arc<str>),
    Boolean(bool),
    Null,
}

impl Scalar {
    pub fn kind(&self) -> ValueKind {
        match self {
            Scalar::Integer(_) => ValueKind::Integer,
            Scalar::Float(_) => ValueKind::Float,
            Scalar::String(_) => ValueKind::String,
            Scalar::Boolean(_) => ValueKind::Boolean,
            Scalar::Null => ValueKind::Null,
        }
    }
}

/// An array is identified by the index that owns its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArrayValue {
    pub owner: MemoryIndex,
}

/// Allocation-site identity of an abstract object.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub Arc<str>);

impl ObjectId {
    pub fn new<S: AsRef<str>>(site: S) -> Self {
        Self(Arc::from(site.as_ref()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectValue {
    pub id: ObjectId,
    pub class: Arc<str>,
}

/// A reference to another index. Only used while wiring up aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AliasValue {
    pub target: MemoryIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningCause {
    UndefinedVariable,
    UndefinedIndex,
    ClassConstantDoesNotExist,
    ConstantOnNonObject,
    UnknownFunction,
    RecursiveCall,
    /// Calls nested deeper than the configured call depth are not analysed.
    CallDepthExceeded,
}

/// An analysis finding. Travels through memory like any other value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InfoValue {
    pub cause: WarningCause,
    pub location: Arc<str>,
    pub message: Arc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// The location holds nothing on some path.
    Undefined,
    /// Any value at all.
    Any,
    /// Any value of one kind.
    AnyOf(ValueKind),
    Scalar(Scalar),
    Interval(Interval),
    Array(ArrayValue),
    Object(ObjectValue),
    Resource(Arc<str>),
    Alias(AliasValue),
    Info(InfoValue),
}

impl Value {
    /// The runtime kind this value stands for, when it has exactly one.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::AnyOf(kind) => Some(*kind),
            Value::Scalar(s) => Some(s.kind()),
            Value::Interval(i) => Some(i.kind()),
            Value::Array(_) => Some(ValueKind::Array),
            Value::Object(_) => Some(ValueKind::Object),
            Value::Resource(_) => Some(ValueKind::Resource),
            Value::Undefined | Value::Any | Value::Alias(_) | Value::Info(_) => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_))
    }

    /// Concrete scalar information that simplification and widening may fold
    /// into a kind-level abstraction.
    pub fn is_simplifiable(&self) -> bool {
        matches!(self, Value::Scalar(_) | Value::Interval(_))
    }

    pub fn accept<V: ValueVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Value::Undefined => visitor.visit_undefined(),
            Value::Any => visitor.visit_any(),
            Value::AnyOf(kind) => visitor.visit_any_of(*kind),
            Value::Scalar(s) => visitor.visit_scalar(s),
            Value::Interval(i) => visitor.visit_interval(i),
            Value::Array(a) => visitor.visit_array(a),
            Value::Object(o) => visitor.visit_object(o),
            Value::Resource(r) => visitor.visit_resource(r),
            Value::Alias(a) => visitor.visit_alias(a),
            Value::Info(i) => visitor.visit_info(i),
        }
    }

    /// True when `self` already describes every concrete value `other` does,
    /// so `other` adds nothing to a set containing `self`.
    pub fn absorbs(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Any, Value::Scalar(_) | Value::Interval(_)) => true,
            (Value::Any, Value::AnyOf(kind)) => kind.is_scalar(),
            (Value::AnyOf(kind), Value::Scalar(s)) => s.kind() == *kind,
            (Value::AnyOf(kind), Value::Interval(i)) => i.kind() == *kind,
            (Value::Interval(outer), Value::Interval(inner)) => {
                outer != inner && outer.contains(inner)
            }
            (Value::Interval(outer), Value::Scalar(s)) => outer.contains_scalar(s),
            _ => false,
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl From<Interval> for Value {
    fn from(value: Interval) -> Self {
        Value::Interval(value)
    }
}

impl From<InfoValue> for Value {
    fn from(value: InfoValue) -> Self {
        Value::Info(value)
    }
}

impl From<ObjectValue> for Value {
    fn from(value: ObjectValue) -> Self {
        Value::Object(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_equality_is_total() {
        assert_eq!(F64(f64::NAN), F64(f64::NAN));
        assert_ne!(F64(0.0), F64(-0.0));
        assert!(F64(1.0) < F64(2.0));
    }

    #[test]
    fn absorption() {
        let one = Value::Scalar(Scalar::Integer(1));
        let a = Value::Scalar(Scalar::String(Arc::from("a")));
        assert!(Value::Any.absorbs(&one));
        assert!(Value::Any.absorbs(&Value::AnyOf(ValueKind::String)));
        assert!(!Value::Any.absorbs(&Value::AnyOf(ValueKind::Array)));
        assert!(!Value::Any.absorbs(&Value::Undefined));
        assert!(Value::AnyOf(ValueKind::Integer).absorbs(&one));
        assert!(!Value::AnyOf(ValueKind::Integer).absorbs(&a));
        assert!(Value::Interval(Interval::integer(0, 3)).absorbs(&one));
        assert!(!Value::Interval(Interval::integer(0, 3)).absorbs(&Value::Interval(Interval::integer(0, 3))));
    }

    #[test]
    fn kinds() {
        assert_eq!(Value::Scalar(Scalar::Null).kind(), Some(ValueKind::Null));
        assert_eq!(Value::Interval(Interval::float(0.0, 1.0)).kind(), Some(ValueKind::Float));
        assert_eq!(Value::Undefined.kind(), None);
        assert!(Value::Array(ArrayValue { owner: MemoryIndex::diagnostics() }).is_composite());
    }
}
