use crate::algorithm::collect::{AliasReach, CollectedIndices, IndexCollector};
use crate::algorithm::copy::ArrayImage;
use crate::error::MemoryError;
use crate::lattice::JoinSemiLattice;
use crate::memory::{AliasStrength, IndexSegment, MemoryEntry, MemoryIndex, ObjectDescriptor};
use crate::snapshot::{Snapshot, StatisticKind};
use crate::value::{ArrayValue, InfoValue, ObjectId, ObjectValue, Scalar, Value};
use memsnap_cfg::{MemoryPath, PathSegment};
use std::sync::Arc;
use tracing::trace;

const STD_CLASS: &str = "stdClass";

impl Snapshot {
    /// Write `entry` to every location `path` denotes.
    ///
    /// Must-locations are replaced, may-locations (possible aliases, unknown
    /// keys) get `entry` unioned in. `force_strong` replaces must-locations
    /// even when the path crossed an unknown member.
    /// Missing arrays and objects along the path are created.
    pub fn assign(
        &mut self,
        path: &MemoryPath,
        entry: MemoryEntry,
        force_strong: bool,
    ) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Assign, |s| {
            if entry.has_alias() {
                return Err(MemoryError::AliasAsData);
            }
            let level = s.call_level();
            let targets = s.collect_for_write(path, level, true);
            let image = s.images_of(&entry);
            s.write_collected(&targets, &entry, image, force_strong);
            Ok(())
        })
    }

    /// Write `entry` to one raw index, without following aliases.
    pub fn assign_index(
        &mut self,
        index: MemoryIndex,
        entry: MemoryEntry,
        strong: bool,
    ) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Assign, |s| {
            if entry.has_alias() {
                return Err(MemoryError::AliasAsData);
            }
            s.store(index, &entry, strong);
            Ok(())
        })
    }

    /// Store the return value of the function running at the current level.
    pub fn assign_return(&mut self, entry: MemoryEntry) -> Result<(), MemoryError> {
        let slot = MemoryIndex::return_slot(self.call_level());
        self.assign_index(slot, entry, true)
    }

    /// `target = &source`: bind every target location to every source
    /// location and copy the source's values over.
    pub fn assign_alias(
        &mut self,
        target: &MemoryPath,
        source: &MemoryPath,
    ) -> Result<(), MemoryError> {
        let level = self.call_level();
        self.mutate(StatisticKind::AssignAlias, |s| {
            s.alias_paths(target, level, source, level)
        })
    }

    /// Bind a parameter of the function just entered to an argument path of
    /// its caller. `source` is resolved in the caller's frame.
    pub fn bind_reference(
        &mut self,
        target: &MemoryPath,
        source: &MemoryPath,
    ) -> Result<(), MemoryError> {
        let level = self.call_level();
        self.mutate(StatisticKind::AssignAlias, |s| {
            let caller = level.checked_sub(1).ok_or(MemoryError::NoCallFrame)?;
            s.alias_paths(target, level, source, caller)
        })
    }

    /// Make `index` an alias of `alias_to`, both of which must exist.
    pub fn create_alias(
        &mut self,
        index: MemoryIndex,
        alias_to: MemoryIndex,
    ) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::CreateAlias, |s| {
            for i in [index, alias_to] {
                if !s.exists(&i) {
                    return Err(MemoryError::MissingIndex(i));
                }
            }
            s.link_alias(index, alias_to)
        })
    }

    /// Store a new, empty array at `path`.
    pub fn create_array(&mut self, path: &MemoryPath) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::CreateArray, |s| {
            let level = s.call_level();
            let targets = s.collect_for_write(path, level, true);
            let entry = MemoryEntry::from(Value::Array(ArrayValue {
                owner: MemoryIndex::fresh_array(),
            }));
            let image = Some(ArrayImage::default());
            s.write_collected(&targets, &entry, image, true);
            Ok(())
        })
    }

    /// Allocate (or, on a later visit of the same site, revisit) the object
    /// of class `class` created at `site`, initialising its fields.
    pub fn create_object<S: AsRef<str>>(
        &mut self,
        class: &str,
        site: S,
        fields: Vec<(String, MemoryEntry)>,
    ) -> Result<ObjectValue, MemoryError> {
        self.mutate(StatisticKind::CreateObject, |s| {
            let object = ObjectValue {
                id: ObjectId::new(site),
                class: Arc::from(class),
            };
            let revisited = s.structure().object(&object.id).is_some();
            if !revisited {
                s.structure_mut()
                    .objects
                    .insert(object.id.clone(), ObjectDescriptor::new(object.class.clone()));
            }
            let root = MemoryIndex::object(object.id.clone());
            for (name, entry) in fields {
                if entry.has_alias() {
                    return Err(MemoryError::AliasAsData);
                }
                s.store(root.field(name), &entry, !revisited);
            }
            Ok(object)
        })
    }

    /// Must-locations disappear; may-locations become possibly undefined.
    pub fn unset(&mut self, path: &MemoryPath) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Unset, |s| {
            let targets = s.collect_at(path, s.call_level(), AliasReach::All, false);
            for index in targets.must.iter() {
                s.remove_index(*index);
            }
            let undefined = MemoryEntry::undefined();
            for index in targets.may.iter() {
                if s.exists(index) {
                    s.store_image(*index, &undefined, None, false);
                }
            }
            Ok(())
        })
    }

    /// Record an analysis finding in the diagnostics index.
    pub fn report(&mut self, info: InfoValue) -> Result<(), MemoryError> {
        self.mutate(StatisticKind::Warning, |s| {
            trace!("reporting {:?} at {}", info.cause, info.location);
            let index = MemoryIndex::diagnostics();
            let mut entry = s.data().entry(&index).cloned().unwrap_or_default();
            entry.insert(Value::Info(info));
            s.write_entry(index, entry);
            Ok(())
        })
    }

    /// Resolve `path` for writing, creating containers that are missing.
    pub(crate) fn collect_for_write(
        &mut self,
        path: &MemoryPath,
        level: usize,
        expand_last: bool,
    ) -> CollectedIndices {
        let mut collector = IndexCollector::root(path, level);
        for segment in &path.segments {
            collector.expand_aliases(self, AliasReach::All);
            self.prepare_containers(collector.current(), segment);
            collector.step(self, segment);
        }
        if expand_last {
            collector.expand_aliases(self, AliasReach::All);
        }
        collector.finish()
    }

    fn prepare_containers(&mut self, current: &CollectedIndices, segment: &PathSegment) {
        let field = IndexSegment::from(segment).is_field();
        let pending: Vec<(MemoryIndex, bool)> = current
            .must
            .iter()
            .map(|i| (*i, true))
            .chain(current.may.iter().map(|i| (*i, false)))
            .collect();
        for (index, strong) in pending {
            let definition = self.structure().definition(&index);
            let container = if field {
                if definition.is_some_and(|d| !d.objects.is_empty()) {
                    continue;
                }
                let object = ObjectValue {
                    id: ObjectId::new(index.to_string()),
                    class: Arc::from(STD_CLASS),
                };
                if self.structure().object(&object.id).is_none() {
                    self.structure_mut()
                        .objects
                        .insert(object.id.clone(), ObjectDescriptor::new(object.class.clone()));
                }
                Value::Object(object)
            } else {
                if definition.is_some_and(|d| d.has_array()) {
                    continue;
                }
                Value::Array(ArrayValue { owner: index })
            };
            trace!("creating container at {}", index);
            let entry = if strong {
                MemoryEntry::from(container)
            } else {
                let mut old = self
                    .data()
                    .entry(&index)
                    .cloned()
                    .unwrap_or_else(MemoryEntry::undefined);
                old.insert(container);
                old
            };
            self.write_entry(index, entry);
        }
    }

    pub(crate) fn write_collected(
        &mut self,
        targets: &CollectedIndices,
        entry: &MemoryEntry,
        image: Option<ArrayImage>,
        force_strong: bool,
    ) {
        // a must-index is uniquely determined unless an unknown member was
        // crossed on the way
        let strong = force_strong || !targets.unknown;
        for index in targets.must.iter() {
            self.store_image(*index, entry, image.clone(), strong);
        }
        for index in targets.may.iter() {
            self.store_image(*index, entry, image.clone(), false);
        }
    }

    fn alias_paths(
        &mut self,
        target: &MemoryPath,
        target_level: usize,
        source: &MemoryPath,
        source_level: usize,
    ) -> Result<(), MemoryError> {
        let sources = self.collect_for_write(source, source_level, false);
        let null = MemoryEntry::from(Value::Scalar(Scalar::Null));
        for index in sources.must.iter() {
            if !self.exists(index) {
                self.store_image(*index, &null, None, true);
            }
        }
        for index in sources.may.iter() {
            if !self.exists(index) {
                self.store_image(*index, &null, None, false);
            }
        }

        let mut value = MemoryEntry::new();
        let mut images = vec![];
        for index in sources.iter() {
            let entry = self.read_index(*index);
            images.extend(entry.arrays().map(|owner| self.image(owner)));
            value.join(&entry);
        }
        let image = ArrayImage::merge(images);

        let targets = self.collect_for_write(target, target_level, false);
        for t in targets.iter() {
            for s in sources.iter() {
                self.link_alias(*t, *s)?;
            }
        }
        self.write_collected(&targets, &value, image, true);
        Ok(())
    }

    /// Add the alias edge `index -> alias_to` by the degrade-on-reassignment
    /// rule and mirror it on `alias_to`. A new must edge whose mirror is
    /// already a may edge means the two sides disagree.
    fn link_alias(&mut self, index: MemoryIndex, alias_to: MemoryIndex) -> Result<(), MemoryError> {
        if index == alias_to {
            return Ok(());
        }
        let structure = self.structure_mut();
        let definition = structure.definitions.entry(index).or_default();
        let previously_must: Vec<MemoryIndex> = definition.aliases.must().iter().copied().collect();
        let strength = definition.aliases.bind(alias_to);
        if strength == AliasStrength::May {
            for peer in previously_must {
                if let Some(peer_definition) = structure.definitions.get_mut(&peer) {
                    peer_definition.aliases.set(index, AliasStrength::May);
                }
            }
        }
        let mirror = &mut structure.definitions.entry(alias_to).or_default().aliases;
        match strength {
            AliasStrength::Must => mirror.insert_must(index)?,
            AliasStrength::May => mirror.set(index, AliasStrength::May),
        }
        trace!("{} aliases {} ({:?})", index, alias_to, strength);
        Ok(())
    }
}
