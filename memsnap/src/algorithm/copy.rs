use crate::lattice::JoinSemiLattice;
use crate::memory::{ArrayDescriptor, IndexNode, IndexSegment, MemoryEntry, MemoryIndex};
use crate::snapshot::{Snapshot, StatisticKind};
use crate::value::{ArrayValue, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// A detached copy of an array's member tree, taken before a write so that
/// `$a = $a[1]` and `$a[1] = $a` copy what was there before the write.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ArrayImage {
    members: BTreeMap<IndexSegment, (MemoryEntry, Option<ArrayImage>)>,
}

impl ArrayImage {
    /// Union several images. A member missing from some image may be undefined.
    pub(crate) fn merge(images: Vec<ArrayImage>) -> Option<ArrayImage> {
        let count = images.len();
        let mut iter = images.into_iter();
        let first = iter.next()?;
        if count == 1 {
            return Some(first);
        }
        let mut grouped: BTreeMap<IndexSegment, (MemoryEntry, Vec<ArrayImage>, usize)> =
            BTreeMap::new();
        for image in std::iter::once(first).chain(iter) {
            for (segment, (entry, sub)) in image.members {
                let slot = grouped.entry(segment).or_default();
                slot.0.join(&entry);
                slot.1.extend(sub);
                slot.2 += 1;
            }
        }
        let members = grouped
            .into_iter()
            .map(|(segment, (mut entry, subs, seen))| {
                if seen < count {
                    entry.insert(Value::Undefined);
                }
                (segment, (entry, ArrayImage::merge(subs)))
            })
            .collect();
        Some(ArrayImage { members })
    }
}

impl Snapshot {
    pub(crate) fn image(&self, owner: MemoryIndex) -> ArrayImage {
        let mut members = BTreeMap::new();
        let Some(definition) = self.structure().definition(&owner) else {
            return ArrayImage::default();
        };
        for member in definition.members() {
            let Some(segment) = member.segment() else {
                continue;
            };
            let entry = self
                .data()
                .entry(member)
                .cloned()
                .unwrap_or_else(MemoryEntry::undefined);
            let sub = self
                .structure()
                .definition(member)
                .filter(|d| d.has_array())
                .map(|_| self.image(*member));
            members.insert(segment.clone(), (entry, sub));
        }
        ArrayImage { members }
    }

    /// Images of every array referenced by `entry`, merged into one.
    pub(crate) fn images_of(&self, entry: &MemoryEntry) -> Option<ArrayImage> {
        ArrayImage::merge(entry.arrays().map(|owner| self.image(owner)).collect())
    }

    /// Write `entry` at `target`, copying arrays by value. Array values in
    /// `entry` are replaced by `target`'s own array, built from `image`.
    pub(crate) fn store_image(
        &mut self,
        target: MemoryIndex,
        entry: &MemoryEntry,
        image: Option<ArrayImage>,
        strong: bool,
    ) {
        let mut values: MemoryEntry = entry
            .values()
            .filter(|v| !matches!(v, Value::Array(_)))
            .cloned()
            .collect();
        if image.is_some() {
            values.insert(Value::Array(ArrayValue { owner: target }));
        }
        let written = if strong {
            self.clear_members(target);
            values
        } else {
            let mut old = self
                .data()
                .entry(&target)
                .cloned()
                .unwrap_or_else(MemoryEntry::undefined);
            old.join(&values);
            old
        };
        self.write_entry(target, written);
        if let Some(image) = image {
            for (segment, (member_entry, sub)) in image.members {
                self.store_image(target.member(segment), &member_entry, sub, strong);
            }
        }
    }

    pub(crate) fn store(&mut self, target: MemoryIndex, entry: &MemoryEntry, strong: bool) {
        let image = self.images_of(entry);
        self.store_image(target, entry, image, strong);
    }

    /// The single place entries are written. Keeps the index's definition in
    /// step with its entry: an array descriptor exists exactly while the entry
    /// holds the index's own array, and the object set mirrors the entry.
    pub(crate) fn write_entry(&mut self, index: MemoryIndex, entry: MemoryEntry) {
        let entry = match self.simplify_limit().and_then(|limit| entry.simplify(limit)) {
            Some(simplified) => {
                self.record(StatisticKind::Simplification);
                trace!("simplified entry of {}", index);
                simplified
            }
            None => entry,
        };
        let holds_array = entry.contains(&Value::Array(ArrayValue { owner: index }));
        let had_array = self
            .structure()
            .definition(&index)
            .is_some_and(|d| d.has_array());
        if had_array && !holds_array {
            self.clear_members(index);
        }
        if let Some(parent) = index.parent() {
            self.register_member(parent, index);
        }
        let objects = entry.objects();
        let definition = self.structure_mut().definitions.entry(index).or_default();
        match (holds_array, definition.array.is_some()) {
            (true, false) => definition.array = Some(ArrayDescriptor::default()),
            (false, true) => definition.array = None,
            _ => {}
        }
        definition.objects = objects;
        self.data_mut().entries.insert(index, entry);
    }

    fn register_member(&mut self, parent: MemoryIndex, member: MemoryIndex) {
        let structure = self.structure_mut();
        if let IndexNode::Object(id) = parent.node() {
            if let Some(object) = structure.objects.get_mut(id) {
                object.fields.insert(member);
            }
            return;
        }
        if let Some(array) = structure
            .definitions
            .get_mut(&parent)
            .and_then(|d| d.array.as_mut())
        {
            array.members.insert(member);
        }
    }

    /// Drop every member of the array owned by `index`, keeping `index`.
    pub(crate) fn clear_members(&mut self, index: MemoryIndex) {
        let members: Vec<MemoryIndex> = match self.structure().definition(&index) {
            Some(d) if d.has_array() => d.members().copied().collect(),
            _ => return,
        };
        for member in members {
            self.remove_index(member);
        }
    }

    /// Remove `index`, its member subtree and every alias edge touching it.
    pub(crate) fn remove_index(&mut self, index: MemoryIndex) {
        if !self.exists(&index) {
            return;
        }
        self.clear_members(index);
        let structure = self.structure_mut();
        if let Some(definition) = structure.definitions.remove(&index) {
            for peer in definition.aliases.iter() {
                if let Some(peer_definition) = structure.definitions.get_mut(peer) {
                    peer_definition.aliases.remove(&index);
                }
            }
        }
        if let Some(parent) = index.parent() {
            match parent.node() {
                IndexNode::Object(id) => {
                    if let Some(object) = structure.objects.get_mut(id) {
                        object.fields.remove(&index);
                    }
                }
                _ => {
                    if let Some(array) = structure
                        .definitions
                        .get_mut(&parent)
                        .and_then(|d| d.array.as_mut())
                    {
                        array.members.remove(&index);
                    }
                }
            }
        }
        self.data_mut().entries.remove(&index);
    }
}
