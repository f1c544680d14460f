use crate::lattice::{JoinSemiLattice, Widen};
use crate::memory::MemoryIndex;
use crate::value::{Interval, ObjectValue, Value, ValueKind};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// The set of values one index may hold.
///
/// Entries are kept normalised: a value is dropped when another member
/// absorbs it (see [`Value::absorbs`]), so `{Any, 1}` is stored as `{Any}`.
/// `Undefined`, composites and `Info` values are never absorbed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MemoryEntry(BTreeSet<Value>);

impl MemoryEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn undefined() -> Self {
        Self::from(Value::Undefined)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.contains(value)
    }

    pub fn has_undefined(&self) -> bool {
        self.0.contains(&Value::Undefined)
    }

    pub fn has_alias(&self) -> bool {
        self.0.iter().any(|v| matches!(v, Value::Alias(_)))
    }

    pub fn insert(&mut self, value: Value) {
        if self.0.iter().any(|held| held.absorbs(&value)) {
            return;
        }
        self.0.retain(|held| !value.absorbs(held));
        self.0.insert(value);
    }

    pub fn remove(&mut self, value: &Value) -> bool {
        self.0.remove(value)
    }

    /// Owners of the array values in this entry.
    pub fn arrays(&self) -> impl Iterator<Item = MemoryIndex> + '_ {
        self.0.iter().filter_map(|v| match v {
            Value::Array(a) => Some(a.owner),
            _ => None,
        })
    }

    pub fn objects(&self) -> BTreeSet<ObjectValue> {
        self.0
            .iter()
            .filter_map(|v| match v {
                Value::Object(o) => Some(o.clone()),
                _ => None,
            })
            .collect()
    }

    /// Every value of `self` is covered by `other`.
    pub fn is_subsumed_by(&self, other: &MemoryEntry) -> bool {
        self.0
            .iter()
            .all(|v| other.0.contains(v) || other.0.iter().any(|held| held.absorbs(v)))
    }

    pub fn simplifiable_count(&self) -> usize {
        self.0.iter().filter(|v| v.is_simplifiable()).count()
    }

    /// Collapse scalars and intervals to `AnyOf(kind)` when there are more
    /// than `limit` of them. Returns `None` when the entry is within the limit.
    pub fn simplify(&self, limit: usize) -> Option<MemoryEntry> {
        if self.simplifiable_count() <= limit {
            return None;
        }
        Some(
            self.0
                .iter()
                .map(|v| match v.kind() {
                    Some(kind) if v.is_simplifiable() => Value::AnyOf(kind),
                    _ => v.clone(),
                })
                .collect(),
        )
    }

    fn simplifiable_by_kind(&self) -> BTreeMap<ValueKind, BTreeSet<&Value>> {
        let mut groups: BTreeMap<ValueKind, BTreeSet<&Value>> = BTreeMap::new();
        for value in self.0.iter().filter(|v| v.is_simplifiable()) {
            if let Some(kind) = value.kind() {
                groups.entry(kind).or_default().insert(value);
            }
        }
        groups
    }
}

fn hull_of<'a, I: IntoIterator<Item = &'a Value>>(values: I) -> Option<Interval> {
    let mut hull: Option<Interval> = None;
    for value in values {
        let interval = match value {
            Value::Interval(i) => Some(*i),
            Value::Scalar(s) => Interval::point(s),
            _ => None,
        }?;
        hull = Some(match hull {
            None => interval,
            Some(h) => h.hull(&interval)?,
        });
    }
    hull
}

impl Widen for MemoryEntry {
    /// Scalars of a kind whose set of literals changed since `previous`
    /// collapse to `AnyOf(kind)`. Numeric kinds that already carry an interval
    /// collapse to a single interval, widened against the previous one.
    fn widen(&self, previous: &Self) -> Self {
        let current = self.simplifiable_by_kind();
        let before = previous.simplifiable_by_kind();
        let mut widened: MemoryEntry = self
            .0
            .iter()
            .filter(|v| !v.is_simplifiable())
            .cloned()
            .collect();
        for (kind, values) in current {
            let old = before.get(&kind);
            if old == Some(&values) {
                for v in values {
                    widened.insert(v.clone());
                }
                continue;
            }
            let has_interval = values.iter().any(|v| matches!(v, Value::Interval(_)));
            let grown = if has_interval { hull_of(values.iter().copied()) } else { None };
            match grown {
                Some(hull) => {
                    let previous_hull = old.and_then(|o| hull_of(o.iter().copied()));
                    let interval = match previous_hull {
                        Some(p) => hull.widen(&p),
                        None => hull,
                    };
                    widened.insert(Value::Interval(interval));
                }
                None => widened.insert(Value::AnyOf(kind)),
            }
        }
        widened
    }
}

impl JoinSemiLattice for MemoryEntry {
    fn join(&mut self, other: &Self) {
        for value in other.0.iter() {
            self.insert(value.clone());
        }
    }
}

impl PartialOrd for MemoryEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self.is_subsumed_by(other), other.is_subsumed_by(self)) {
            (true, _) => Some(Ordering::Less),
            (_, true) => Some(Ordering::Greater),
            _ => None,
        }
    }
}

impl FromIterator<Value> for MemoryEntry {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        let mut entry = MemoryEntry::new();
        for value in iter {
            entry.insert(value);
        }
        entry
    }
}

impl From<Value> for MemoryEntry {
    fn from(value: Value) -> Self {
        let mut entry = MemoryEntry::new();
        entry.insert(value);
        entry
    }
}

impl<'a> IntoIterator for &'a MemoryEntry {
    type Item = &'a Value;
    type IntoIter = std::collections::btree_set::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Bound, Scalar};
    use std::sync::Arc;

    fn int(i: i64) -> Value {
        Value::Scalar(Scalar::Integer(i))
    }

    fn string(s: &str) -> Value {
        Value::Scalar(Scalar::String(Arc::from(s)))
    }

    #[test]
    fn normalisation_drops_absorbed_values() {
        let entry: MemoryEntry = [int(1), Value::AnyOf(ValueKind::Integer), string("a")]
            .into_iter()
            .collect();
        assert_eq!(entry.len(), 2);
        assert!(entry.contains(&string("a")));

        let entry: MemoryEntry = [Value::Undefined, int(2), Value::Any].into_iter().collect();
        assert_eq!(
            entry,
            [Value::Undefined, Value::Any].into_iter().collect::<MemoryEntry>()
        );
    }

    #[test]
    fn join_is_commutative_and_ordered() {
        let a: MemoryEntry = [int(1)].into_iter().collect();
        let b: MemoryEntry = [string("x"), Value::Undefined].into_iter().collect();
        let mut ab = a.clone();
        ab.join(&b);
        let mut ba = b.clone();
        ba.join(&a);
        assert_eq!(ab, ba);
        assert!(a < ab);
        assert!(ab > b);
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn simplify_counts_only_scalars() {
        let entry: MemoryEntry = [int(1), int(2), string("a"), Value::Undefined]
            .into_iter()
            .collect();
        assert!(entry.simplify(3).is_none());
        let simplified = entry.simplify(2).unwrap();
        assert_eq!(
            simplified,
            [
                Value::AnyOf(ValueKind::Integer),
                Value::AnyOf(ValueKind::String),
                Value::Undefined
            ]
            .into_iter()
            .collect::<MemoryEntry>()
        );
    }

    #[test]
    fn widening_collapses_changed_kinds_only() {
        let before: MemoryEntry = [int(1), string("a")].into_iter().collect();
        let after: MemoryEntry = [int(1), int(2), string("a")].into_iter().collect();
        let widened = after.widen(&before);
        assert_eq!(
            widened,
            [Value::AnyOf(ValueKind::Integer), string("a")]
                .into_iter()
                .collect::<MemoryEntry>()
        );
        assert_eq!(after.widen(&after), after);
    }

    #[test]
    fn widening_intervals() {
        let before: MemoryEntry = [Value::Interval(Interval::integer(0, 3))].into_iter().collect();
        let after: MemoryEntry = [Value::Interval(Interval::integer(0, 3)), int(7)]
            .into_iter()
            .collect();
        let widened = after.widen(&before);
        assert_eq!(
            widened,
            MemoryEntry::from(Value::Interval(Interval::Integer {
                start: Bound::Finite(0),
                end: Bound::PosInf
            }))
        );
    }
}
