use crate::memory::{IndexNode, IndexSegment, MemoryEntry, MemoryIndex, VariableScope};
use crate::snapshot::{Snapshot, StatisticKind};
use crate::value::{
    AliasValue, ArrayValue, Bound, F64, InfoValue, Interval, ObjectValue, Scalar, Value, ValueKind,
    ValueVisitor, WarningCause,
};
use itertools::Itertools;
use std::fmt::{Display, Formatter};

impl Display for IndexSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexSegment::Key(k) => write!(f, "[{k}]"),
            IndexSegment::UnknownKey => write!(f, "[?]"),
            IndexSegment::Field(name) => write!(f, "->{name}"),
            IndexSegment::UnknownField => write!(f, "->?"),
        }
    }
}

impl Display for MemoryIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.node() {
            IndexNode::Variable {
                name,
                scope: VariableScope::Global,
            } => write!(f, "${name}"),
            IndexNode::Variable {
                name,
                scope: VariableScope::Local(level),
            } => write!(f, "${name}@{level}"),
            IndexNode::Control { name } => write!(f, "#{name}"),
            IndexNode::Return { level } => write!(f, "return@{level}"),
            IndexNode::Object(id) => write!(f, "obj({})", id.0),
            IndexNode::Member { parent, segment } => write!(f, "{parent}{segment}"),
        }
    }
}

fn fmt_bound<T: Display>(bound: &Bound<T>) -> String {
    match bound {
        Bound::NegInf => "-inf".to_string(),
        Bound::Finite(v) => v.to_string(),
        Bound::PosInf => "+inf".to_string(),
    }
}

impl Display for F64 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Integer { start, end } => {
                write!(f, "[{}..{}]", fmt_bound(start), fmt_bound(end))
            }
            Interval::Float { start, end } => {
                write!(f, "[{}..{}]", fmt_bound(start), fmt_bound(end))
            }
        }
    }
}

impl Display for WarningCause {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WarningCause::UndefinedVariable => "undefined variable",
            WarningCause::UndefinedIndex => "undefined index",
            WarningCause::ClassConstantDoesNotExist => "class constant does not exist",
            WarningCause::ConstantOnNonObject => "constant access on non-object",
            WarningCause::UnknownFunction => "unknown function",
            WarningCause::RecursiveCall => "recursive call approximated",
            WarningCause::CallDepthExceeded => "call depth exceeded",
        };
        write!(f, "{s}")
    }
}

impl Display for InfoValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.location, self.cause, self.message)
    }
}

impl Display for StatisticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Renders values in the listing syntax used by dumps and test failures.
struct ValuePrinter;

impl ValueVisitor for ValuePrinter {
    type Output = String;

    fn visit_undefined(&mut self) -> String {
        "undefined".to_string()
    }

    fn visit_any(&mut self) -> String {
        "any".to_string()
    }

    fn visit_any_of(&mut self, kind: ValueKind) -> String {
        format!("any<{kind}>")
    }

    fn visit_scalar(&mut self, scalar: &Scalar) -> String {
        match scalar {
            Scalar::Integer(i) => i.to_string(),
            Scalar::Float(x) => x.to_string(),
            Scalar::String(s) => format!("{s:?}"),
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Null => "null".to_string(),
        }
    }

    fn visit_interval(&mut self, interval: &Interval) -> String {
        interval.to_string()
    }

    fn visit_array(&mut self, array: &ArrayValue) -> String {
        format!("array({})", array.owner)
    }

    fn visit_object(&mut self, object: &ObjectValue) -> String {
        format!("{}#{}", object.class, object.id.0)
    }

    fn visit_resource(&mut self, name: &str) -> String {
        format!("resource({name})")
    }

    fn visit_alias(&mut self, alias: &AliasValue) -> String {
        format!("&{}", alias.target)
    }

    fn visit_info(&mut self, info: &InfoValue) -> String {
        format!("info({})", info.cause)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.accept(&mut ValuePrinter))
    }
}

impl Display for MemoryEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.values().join(", "))
    }
}

/// Every index of a snapshot with its values and aliases, one per line.
pub struct SnapshotDump<'a>(&'a Snapshot);

impl Display for SnapshotDump<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.0;
        writeln!(f, "call level {}", snapshot.call_level())?;
        for (index, entry) in snapshot.data().iter() {
            write!(f, "{index} = {entry}")?;
            if let Some(aliases) = snapshot.aliases(index) {
                let must = aliases.must().iter().map(|i| format!("must {i}"));
                let may = aliases.may().iter().map(|i| format!("may {i}"));
                write!(f, " aliases [{}]", must.chain(may).join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Snapshot {
    pub fn dump(&self) -> SnapshotDump<'_> {
        SnapshotDump(self)
    }
}
