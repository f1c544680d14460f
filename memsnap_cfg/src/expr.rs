use crate::path::MemoryPath;
use serde::{Deserialize, Serialize};

/// The runtime kinds of the analysed language.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ValueKind {
    Integer,
    Float,
    String,
    Boolean,
    Null,
    Object,
    Array,
    Resource,
}

impl ValueKind {
    pub const ALL: [ValueKind; 8] = [
        ValueKind::Integer,
        ValueKind::Float,
        ValueKind::String,
        ValueKind::Boolean,
        ValueKind::Null,
        ValueKind::Object,
        ValueKind::Array,
        ValueKind::Resource,
    ];

    /// Kinds whose values carry no memory structure of their own.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            ValueKind::Object | ValueKind::Array | ValueKind::Resource
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Integer => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Boolean => "bool",
            ValueKind::Null => "null",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Resource => "resource",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

/// A constant appearing in the source program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn kind(&self) -> ValueKind {
        match self {
            Literal::Integer(_) => ValueKind::Integer,
            Literal::Float(_) => ValueKind::Float,
            Literal::String(_) => ValueKind::String,
            Literal::Boolean(_) => ValueKind::Boolean,
            Literal::Null => ValueKind::Null,
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

/// A source expression already reduced to the vocabulary the memory model
/// understands. Operators are resolved by the front-end; whatever it cannot
/// compute arrives as [`Expr::Any`] or [`Expr::AnyOf`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    /// A value about which nothing is known.
    Any,
    /// Some value of the given kind.
    AnyOf(ValueKind),
    /// An integer in `[start, end]`.
    Interval { start: i64, end: i64 },
    /// The current value(s) stored at a path.
    Read(MemoryPath),
    /// `array()`
    NewArray,
    /// `new Class`
    NewObject { class: String },
    /// `$target::NAME`, a class constant looked up through an object.
    ClassConstant { target: MemoryPath, name: String },
}

impl Expr {
    pub fn literal<L: Into<Literal>>(value: L) -> Self {
        Expr::Literal(value.into())
    }

    pub fn read(path: MemoryPath) -> Self {
        Expr::Read(path)
    }

    /// Every path this expression reads from.
    pub fn reads(&self) -> Option<&MemoryPath> {
        match self {
            Expr::Read(path) | Expr::ClassConstant { target: path, .. } => Some(path),
            _ => None,
        }
    }
}

impl From<Literal> for Expr {
    fn from(value: Literal) -> Self {
        Expr::Literal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ValueKind::from_name("bogus"), None);
        assert!(ValueKind::Boolean.is_scalar());
        assert!(!ValueKind::Array.is_scalar());
    }

    #[test]
    fn literal_kinds() {
        assert_eq!(Literal::from(3).kind(), ValueKind::Integer);
        assert_eq!(Literal::from("a").kind(), ValueKind::String);
        assert_eq!(Literal::Null.kind(), ValueKind::Null);
        assert_eq!(
            Expr::read(MemoryPath::local("x")).reads(),
            Some(&MemoryPath::local("x"))
        );
    }
}
