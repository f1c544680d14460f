use crate::snapshot::{SnapshotStatistics, StatisticKind};
use crate::value::{F64, InfoValue, Interval, Scalar, Value, ValueKind, WarningCause};
use memsnap_cfg::Literal;
use std::sync::Arc;

/// Builds values on behalf of one snapshot, counting every construction in
/// that snapshot's statistics. Obtained from
/// [`Snapshot::values`](crate::Snapshot::values).
pub struct ValueFactory<'a> {
    statistics: &'a mut SnapshotStatistics,
}

impl<'a> ValueFactory<'a> {
    pub(crate) fn new(statistics: &'a mut SnapshotStatistics) -> Self {
        Self { statistics }
    }

    fn created(&mut self, value: Value) -> Value {
        self.statistics.record(StatisticKind::ValueCreated);
        value
    }

    pub fn undefined(&mut self) -> Value {
        self.created(Value::Undefined)
    }

    pub fn any(&mut self) -> Value {
        self.created(Value::Any)
    }

    pub fn any_of(&mut self, kind: ValueKind) -> Value {
        self.created(Value::AnyOf(kind))
    }

    pub fn integer(&mut self, value: i64) -> Value {
        self.created(Value::Scalar(Scalar::Integer(value)))
    }

    pub fn float(&mut self, value: f64) -> Value {
        self.created(Value::Scalar(Scalar::Float(F64(value))))
    }

    pub fn string<S: AsRef<str>>(&mut self, value: S) -> Value {
        self.created(Value::Scalar(Scalar::String(Arc::from(value.as_ref()))))
    }

    pub fn boolean(&mut self, value: bool) -> Value {
        self.created(Value::Scalar(Scalar::Boolean(value)))
    }

    pub fn null(&mut self) -> Value {
        self.created(Value::Scalar(Scalar::Null))
    }

    pub fn integer_interval(&mut self, start: i64, end: i64) -> Value {
        self.created(Value::Interval(Interval::integer(start, end)))
    }

    pub fn float_interval(&mut self, start: f64, end: f64) -> Value {
        self.created(Value::Interval(Interval::float(start, end)))
    }

    pub fn resource<S: AsRef<str>>(&mut self, name: S) -> Value {
        self.created(Value::Resource(Arc::from(name.as_ref())))
    }

    /// A finding for [`Snapshot::report`](crate::Snapshot::report).
    pub fn info<L: AsRef<str>, M: AsRef<str>>(
        &mut self,
        cause: WarningCause,
        location: L,
        message: M,
    ) -> InfoValue {
        self.statistics.record(StatisticKind::ValueCreated);
        InfoValue {
            cause,
            location: Arc::from(location.as_ref()),
            message: Arc::from(message.as_ref()),
        }
    }

    pub fn literal(&mut self, literal: &Literal) -> Value {
        match literal {
            Literal::Integer(i) => self.integer(*i),
            Literal::Float(f) => self.float(*f),
            Literal::String(s) => self.string(s),
            Literal::Boolean(b) => self.boolean(*b),
            Literal::Null => self.null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_construction_is_counted() {
        let mut statistics = SnapshotStatistics::default();
        let mut values = ValueFactory::new(&mut statistics);
        assert_eq!(values.literal(&Literal::from(3)), Value::Scalar(Scalar::Integer(3)));
        values.any_of(ValueKind::String);
        values.info(WarningCause::UnknownFunction, "main:1", "f");
        assert_eq!(statistics.get(StatisticKind::ValueCreated), 3);
    }
}
