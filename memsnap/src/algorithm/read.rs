use crate::algorithm::collect::{AliasReach, CollectedIndices, members_of};
use crate::lattice::JoinSemiLattice;
use crate::memory::{IndexSegment, MemoryEntry, MemoryIndex};
use crate::snapshot::Snapshot;
use crate::value::{InfoValue, Value, ValueKind};
use memsnap_cfg::MemoryPath;
use std::collections::BTreeSet;

impl Snapshot {
    /// Every value `path` may evaluate to in the current frame. May-aliases
    /// of the locations read are not consulted.
    pub fn read_value(&self, path: &MemoryPath) -> MemoryEntry {
        self.read_value_at(path, self.call_level())
    }

    /// Like [`Snapshot::read_value`], resolving local variables in the frame
    /// of call level `level`.
    pub fn read_value_at(&self, path: &MemoryPath, level: usize) -> MemoryEntry {
        let targets = self.collect_at(path, level, AliasReach::Must, true);
        self.read_collected(&targets)
    }

    pub fn read_collected(&self, targets: &CollectedIndices) -> MemoryEntry {
        if targets.is_empty() {
            return MemoryEntry::undefined();
        }
        if targets.unknown {
            // an unknown member nobody wrote to stands for no keys at all
            let entries: Vec<MemoryEntry> = targets
                .iter()
                .filter(|i| self.exists(i) || !i.is_unknown_member())
                .map(|i| self.read_index(*i))
                .collect();
            widened_read(&entries)
        } else {
            let mut result = MemoryEntry::new();
            for index in targets.iter() {
                result.join(&self.read_index(*index));
            }
            result
        }
    }

    /// The values stored at `index`. A location that does not exist reads as
    /// undefined, unless its container says otherwise: the container's
    /// unknown member covers absent keys, and a container that may be anything
    /// yields anything.
    pub fn read_index(&self, index: MemoryIndex) -> MemoryEntry {
        if let Some(entry) = self.data().entry(&index) {
            return entry.clone();
        }
        let (Some(parent), Some(segment)) = (index.parent(), index.segment()) else {
            return MemoryEntry::undefined();
        };
        let unknown = if segment.is_field() {
            IndexSegment::UnknownField
        } else {
            IndexSegment::UnknownKey
        };
        let mut entry = match self.data().entry(&parent.member(unknown)) {
            Some(fallback) if !segment.is_unknown() => fallback.clone(),
            _ => MemoryEntry::undefined(),
        };
        let opaque_parent = self.data().entry(&parent).is_some_and(|p| {
            p.contains(&Value::Any)
                || p.contains(&Value::AnyOf(if segment.is_field() {
                    ValueKind::Object
                } else {
                    ValueKind::Array
                }))
        });
        if opaque_parent {
            entry.insert(Value::Any);
        }
        entry
    }

    /// The findings reported into this snapshot, in order.
    pub fn warnings(&self) -> Vec<InfoValue> {
        self.data()
            .entry(&MemoryIndex::diagnostics())
            .map(|e| {
                e.values()
                    .filter_map(|v| match v {
                        Value::Info(info) => Some(info.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The values of `container`'s member `segment`. Fields are looked up in
    /// every object `container` may reference.
    pub fn read_member(&self, container: MemoryIndex, segment: &IndexSegment) -> MemoryEntry {
        let containers: Vec<MemoryIndex> = if segment.is_field() {
            let objects: Vec<MemoryIndex> = self
                .structure()
                .definition(&container)
                .map(|d| {
                    d.objects
                        .iter()
                        .map(|o| MemoryIndex::object(o.id.clone()))
                        .collect()
                })
                .unwrap_or_default();
            if objects.is_empty() {
                vec![container]
            } else {
                objects
            }
        } else {
            vec![container]
        };
        let mut targets = CollectedIndices {
            unknown: segment.is_unknown(),
            ..Default::default()
        };
        for c in containers {
            if segment.is_unknown() {
                targets.may.extend(members_of(self, c, segment.is_field()));
            }
            targets.may.insert(c.member(segment.clone()));
        }
        self.read_collected(&targets)
    }
}

/// Reading through an unknown key cannot name one location, so the result is
/// summarised by kind: one common kind gives `AnyOf(kind)`, several give
/// `Any`. Possible undefinedness is kept.
fn widened_read(entries: &[MemoryEntry]) -> MemoryEntry {
    let mut kinds = BTreeSet::new();
    let mut unkinded = false;
    let mut undefined = false;
    for value in entries.iter().flat_map(|e| e.values()) {
        match value {
            Value::Undefined => undefined = true,
            Value::Info(_) => {}
            v => match v.kind() {
                Some(kind) => {
                    kinds.insert(kind);
                }
                None => unkinded = true,
            },
        }
    }
    let mut result = MemoryEntry::new();
    if unkinded || kinds.len() > 1 {
        result.insert(Value::Any);
    } else if let Some(kind) = kinds.into_iter().next() {
        result.insert(Value::AnyOf(kind));
    }
    if undefined || result.is_empty() {
        result.insert(Value::Undefined);
    }
    result
}
