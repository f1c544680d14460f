use crate::algorithm::copy::ArrayImage;
use crate::error::MemoryError;
use crate::lattice::JoinSemiLattice;
use crate::memory::{
    AliasSet, AliasStrength, ArrayDescriptor, IndexDefinition, MemoryEntry, MemoryIndex,
    ObjectDescriptor,
};
use crate::snapshot::{Snapshot, SnapshotData, SnapshotStructure, StatisticKind};
use crate::value::{Scalar, Value};
use memsnap_cfg::MemoryPath;
use std::collections::BTreeSet;
use tracing::debug;

impl Snapshot {
    /// Replace this snapshot's content with the combination of `sources`.
    ///
    /// A single source is shared rather than copied. Several sources are
    /// merged: every index any source defines exists afterwards, holding the
    /// union of the sources' values, with `Undefined` contributed by each
    /// source that lacks it.
    pub fn extend(&mut self, sources: &[&Snapshot]) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Extend, |s| s.extend_from(sources))
    }

    /// Start the frame of a function called from `caller`: the caller's memory
    /// with one more call level.
    pub fn extend_as_call(&mut self, caller: &Snapshot) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Extend, |s| {
            s.share(caller);
            s.structure_mut().call_level += 1;
            debug!("entered call level {}", s.call_level());
            Ok(())
        })
    }

    /// Merge the exit snapshots of a callee and close its frame. The return
    /// value (null when the callee returns nothing) is written to `result`.
    pub fn merge_with_call(
        &mut self,
        result: Option<&MemoryPath>,
        outputs: &[&Snapshot],
    ) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::MergeWithCall, |s| {
            s.extend_from(outputs)?;
            let level = s.call_level();
            if level == 0 {
                return Err(MemoryError::NoCallFrame);
            }

            let mut returned = s.read_index(MemoryIndex::return_slot(level));
            if returned.remove(&Value::Undefined) || returned.is_empty() {
                returned.insert(Value::Scalar(Scalar::Null));
            }
            let image = s.images_of(&returned);

            let frame: Vec<MemoryIndex> = s
                .structure()
                .indices()
                .filter(|i| i.is_rooted_at_level(level))
                .copied()
                .collect();
            for index in frame {
                s.remove_index(index);
            }
            s.structure_mut().call_level = level - 1;
            debug!("returned to call level {}", level - 1);

            if let Some(path) = result {
                let targets = s.collect_for_write(path, level - 1, true);
                s.write_collected(&targets, &returned, image, true);
            }
            Ok(())
        })
    }

    /// Merge the given (index, snapshot) sources into `output`: the values are
    /// unioned and an alias survives as a must-alias only where every source
    /// has it as one.
    pub fn merge_into(
        &mut self,
        output: MemoryIndex,
        sources: &[(MemoryIndex, &Snapshot)],
    ) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Merge, |s| {
            if sources.is_empty() {
                return Err(MemoryError::NoSources);
            }
            let mut entry = MemoryEntry::new();
            let mut images = vec![];
            for (index, snapshot) in sources {
                match snapshot.data().entry(index) {
                    Some(e) => {
                        images.extend(e.arrays().map(|owner| snapshot.image(owner)));
                        entry.join(e);
                    }
                    None => entry.insert(Value::Undefined),
                }
            }
            let aliases = AliasSet::merge(
                sources
                    .iter()
                    .map(|(index, snapshot)| snapshot.structure().definition(index).map(|d| &d.aliases)),
            )?;
            s.store_image(output, &entry, ArrayImage::merge(images), true);

            let structure = s.structure_mut();
            let mut kept = AliasSet::default();
            for peer in aliases.must() {
                if *peer != output && structure.definitions.contains_key(peer) {
                    kept.insert_must(*peer)?;
                }
            }
            for peer in aliases.may() {
                if *peer != output && structure.definitions.contains_key(peer) {
                    kept.insert_may(*peer)?;
                }
            }
            let previous = structure
                .definitions
                .get(&output)
                .map(|d| d.aliases.clone())
                .unwrap_or_default();
            for peer in previous.iter() {
                if let Some(d) = structure.definitions.get_mut(peer) {
                    d.aliases.remove(&output);
                }
            }
            for peer in kept.must() {
                if let Some(d) = structure.definitions.get_mut(peer) {
                    d.aliases.set(output, AliasStrength::Must);
                }
            }
            for peer in kept.may() {
                if let Some(d) = structure.definitions.get_mut(peer) {
                    d.aliases.set(output, AliasStrength::May);
                }
            }
            structure.definitions.entry(output).or_default().aliases = kept;
            Ok(())
        })
    }

    pub(crate) fn extend_from(&mut self, sources: &[&Snapshot]) -> Result<(), MemoryError> {
        let first = sources.first().ok_or(MemoryError::NoSources)?;
        let level = first.call_level();
        if let Some(other) = sources.iter().find(|s| s.call_level() != level) {
            return Err(MemoryError::CallLevelMismatch {
                expected: level,
                found: other.call_level(),
            });
        }
        if sources.len() == 1 {
            self.share(first);
            return Ok(());
        }
        let (structure, data) = merge_snapshots(sources, level)?;
        self.replace(structure, data);
        self.simplify_all();
        Ok(())
    }

    fn simplify_all(&mut self) {
        let Some(limit) = self.simplify_limit() else {
            return;
        };
        let oversized: Vec<(MemoryIndex, MemoryEntry)> = self
            .data()
            .iter()
            .filter_map(|(i, e)| e.simplify(limit).map(|s| (*i, s)))
            .collect();
        for (index, entry) in oversized {
            self.record(StatisticKind::Simplification);
            self.data_mut().entries.insert(index, entry);
        }
    }
}

/// Structure first, then data.
fn merge_snapshots(
    sources: &[&Snapshot],
    level: usize,
) -> Result<(SnapshotStructure, SnapshotData), MemoryError> {
    let indices: BTreeSet<MemoryIndex> = sources
        .iter()
        .flat_map(|s| s.structure().indices().copied())
        .collect();

    let mut structure = SnapshotStructure {
        call_level: level,
        ..Default::default()
    };
    for index in indices.iter() {
        let definitions: Vec<Option<&IndexDefinition>> = sources
            .iter()
            .map(|s| s.structure().definition(index))
            .collect();
        let aliases = AliasSet::merge(definitions.iter().map(|d| d.map(|d| &d.aliases)))?;
        let mut array: Option<ArrayDescriptor> = None;
        let mut objects = BTreeSet::new();
        for definition in definitions.iter().flatten() {
            if let Some(a) = &definition.array {
                array
                    .get_or_insert_with(ArrayDescriptor::default)
                    .members
                    .extend(a.members.iter().copied());
            }
            objects.extend(definition.objects.iter().cloned());
        }
        structure.definitions.insert(
            *index,
            IndexDefinition {
                aliases,
                array,
                objects,
            },
        );
    }
    for source in sources {
        for (id, descriptor) in source.structure().objects() {
            structure
                .objects
                .entry(id.clone())
                .and_modify(|d: &mut ObjectDescriptor| {
                    d.fields.extend(descriptor.fields.iter().copied())
                })
                .or_insert_with(|| descriptor.clone());
        }
    }

    let mut data = SnapshotData::default();
    for index in indices {
        let mut entry = MemoryEntry::new();
        for source in sources {
            match source.data().entry(&index) {
                Some(e) => entry.join(e),
                None => entry.insert(Value::Undefined),
            }
        }
        data.entries.insert(index, entry);
    }
    Ok((structure, data))
}
