use std::collections::BTreeMap;

/// One counter per kind of snapshot operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatisticKind {
    StartTransaction,
    CommitTransaction,
    Assign,
    AssignAlias,
    CreateAlias,
    CreateArray,
    CreateObject,
    Extend,
    Merge,
    MergeWithCall,
    Unset,
    Warning,
    ValueCreated,
    Widening,
    Simplification,
}

/// Usage counters of one snapshot. Purely diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStatistics {
    counters: BTreeMap<StatisticKind, u64>,
}

impl SnapshotStatistics {
    pub fn get(&self, kind: StatisticKind) -> u64 {
        self.counters.get(&kind).copied().unwrap_or_default()
    }

    pub(crate) fn record(&mut self, kind: StatisticKind) {
        *self.counters.entry(kind).or_default() += 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatisticKind, u64)> + '_ {
        self.counters.iter().map(|(k, v)| (*k, *v))
    }

    /// Fold another snapshot's counters into this one.
    pub fn absorb(&mut self, other: &SnapshotStatistics) {
        for (kind, count) in other.iter() {
            *self.counters.entry(kind).or_default() += count;
        }
    }
}
