use crate::value::{AliasValue, ArrayValue, InfoValue, Interval, ObjectValue, Scalar, ValueKind};

/// Exhaustive per-variant dispatch over [`Value`](crate::value::Value), used
/// through [`Value::accept`](crate::value::Value::accept).
pub trait ValueVisitor {
    type Output;

    fn visit_undefined(&mut self) -> Self::Output;
    fn visit_any(&mut self) -> Self::Output;
    fn visit_any_of(&mut self, kind: ValueKind) -> Self::Output;
    fn visit_scalar(&mut self, scalar: &Scalar) -> Self::Output;
    fn visit_interval(&mut self, interval: &Interval) -> Self::Output;
    fn visit_array(&mut self, array: &ArrayValue) -> Self::Output;
    fn visit_object(&mut self, object: &ObjectValue) -> Self::Output;
    fn visit_resource(&mut self, name: &str) -> Self::Output;
    fn visit_alias(&mut self, alias: &AliasValue) -> Self::Output;
    fn visit_info(&mut self, info: &InfoValue) -> Self::Output;
}
