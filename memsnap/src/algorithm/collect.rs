use crate::memory::{IndexNode, IndexSegment, MemoryIndex, VariableScope};
use crate::snapshot::Snapshot;
use memsnap_cfg::{MemoryPath, PathSegment, Scope};
use std::collections::BTreeSet;

/// The locations a path resolves to in one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedIndices {
    /// Locations the path certainly denotes.
    pub must: BTreeSet<MemoryIndex>,
    /// Locations the path possibly denotes. Disjoint from `must`.
    pub may: BTreeSet<MemoryIndex>,
    /// An unknown key or field was crossed on the way.
    pub unknown: bool,
}

impl CollectedIndices {
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.may.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryIndex> {
        self.must.iter().chain(self.may.iter())
    }

    fn insert(&mut self, index: MemoryIndex, must: bool) {
        if must {
            self.may.remove(&index);
            self.must.insert(index);
        } else if !self.must.contains(&index) {
            self.may.insert(index);
        }
    }
}

/// Which alias edges path resolution follows.
///
/// Every write reaches all aliases of its target, so each location holds
/// everything that may have been written through its may-aliases. Reads
/// therefore only need must-aliases, which always hold the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AliasReach {
    /// Must-aliases only.
    Must,
    /// Must- and may-aliases, transitively.
    All,
}

/// Resolves a [`MemoryPath`] one segment at a time, so writers can create
/// missing containers between steps.
pub(crate) struct IndexCollector {
    indices: CollectedIndices,
}

impl IndexCollector {
    pub(crate) fn root(path: &MemoryPath, level: usize) -> Self {
        let scope = match path.scope {
            Scope::Global => VariableScope::Global,
            Scope::Local => VariableScope::at_level(level),
        };
        let mut indices = CollectedIndices::default();
        indices.must.insert(MemoryIndex::variable(&path.name, scope));
        Self { indices }
    }

    pub(crate) fn current(&self) -> &CollectedIndices {
        &self.indices
    }

    pub(crate) fn finish(self) -> CollectedIndices {
        self.indices
    }

    /// Close the current set under aliasing. Must-aliases of must-indices are
    /// must; with `reach` set to [`AliasReach::All`], everything else
    /// reachable through an alias edge is added as may.
    pub(crate) fn expand_aliases(&mut self, snapshot: &Snapshot, reach: AliasReach) {
        let mut must_queue: Vec<MemoryIndex> = self.indices.must.iter().copied().collect();
        let mut may_queue: Vec<MemoryIndex> = vec![];
        while let Some(index) = must_queue.pop() {
            let Some(aliases) = snapshot.aliases(&index) else {
                continue;
            };
            for alias in aliases.must() {
                if !self.indices.must.contains(alias) {
                    self.indices.insert(*alias, true);
                    must_queue.push(*alias);
                }
            }
            if reach == AliasReach::All {
                for alias in aliases.may() {
                    if !self.indices.must.contains(alias) && self.indices.may.insert(*alias) {
                        may_queue.push(*alias);
                    }
                }
            }
        }
        if reach != AliasReach::All {
            return;
        }
        may_queue.extend(self.indices.may.iter().copied());
        while let Some(index) = may_queue.pop() {
            if self.indices.must.contains(&index) {
                continue;
            }
            let Some(aliases) = snapshot.aliases(&index) else {
                continue;
            };
            for alias in aliases.iter() {
                if !self.indices.must.contains(alias) && self.indices.may.insert(*alias) {
                    may_queue.push(*alias);
                }
            }
        }
    }

    /// Move every current index one segment down.
    pub(crate) fn step(&mut self, snapshot: &Snapshot, segment: &PathSegment) {
        let segment = IndexSegment::from(segment);
        let mut next = CollectedIndices {
            unknown: self.indices.unknown || segment.is_unknown(),
            ..Default::default()
        };
        let current: Vec<(MemoryIndex, bool)> = self
            .indices
            .must
            .iter()
            .map(|i| (*i, true))
            .chain(self.indices.may.iter().map(|i| (*i, false)))
            .collect();
        for (index, certain) in current {
            let containers = containers_of(snapshot, index, &segment);
            let certain = certain && containers.len() == 1;
            for container in containers {
                if segment.is_unknown() {
                    for member in members_of(snapshot, container, segment.is_field()) {
                        next.insert(member, false);
                    }
                    next.insert(container.member(segment.clone()), false);
                } else {
                    next.insert(container.member(segment.clone()), certain);
                }
            }
        }
        self.indices = next;
    }
}

/// The indices below which `segment` is looked up: the index itself for
/// array keys, the roots of the objects it references for fields. An index
/// that references no object acts as its own field container, so the lookup
/// still names a (non-existent) location.
fn containers_of(snapshot: &Snapshot, index: MemoryIndex, segment: &IndexSegment) -> Vec<MemoryIndex> {
    if !segment.is_field() {
        return vec![index];
    }
    let objects: Vec<MemoryIndex> = snapshot
        .structure()
        .definition(&index)
        .map(|d| {
            d.objects
                .iter()
                .map(|o| MemoryIndex::object(o.id.clone()))
                .collect()
        })
        .unwrap_or_default();
    if objects.is_empty() {
        vec![index]
    } else {
        objects
    }
}

pub(crate) fn members_of(snapshot: &Snapshot, container: MemoryIndex, fields: bool) -> Vec<MemoryIndex> {
    if fields {
        if let IndexNode::Object(id) = container.node() {
            return snapshot
                .structure()
                .object(id)
                .map(|o| o.fields.iter().copied().collect())
                .unwrap_or_default();
        }
        return vec![];
    }
    snapshot
        .structure()
        .definition(&container)
        .map(|d| d.members().copied().collect())
        .unwrap_or_default()
}

impl Snapshot {
    /// Resolve `path` without changing anything, for reading.
    pub fn collect(&self, path: &MemoryPath) -> CollectedIndices {
        self.collect_at(path, self.call_level(), AliasReach::Must, true)
    }

    /// `reach` applies between steps; `expand_last` also applies it after
    /// the last step.
    pub(crate) fn collect_at(
        &self,
        path: &MemoryPath,
        level: usize,
        reach: AliasReach,
        expand_last: bool,
    ) -> CollectedIndices {
        let mut collector = IndexCollector::root(path, level);
        for segment in &path.segments {
            collector.expand_aliases(self, reach);
            collector.step(self, segment);
        }
        if expand_last {
            collector.expand_aliases(self, reach);
        }
        collector.finish()
    }
}
