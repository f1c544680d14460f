use crate::error::MemoryError;
use crate::memory::MemoryIndex;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasStrength {
    Must,
    May,
}

/// The aliases of one index. `must` and `may` never share an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AliasSet {
    must: BTreeSet<MemoryIndex>,
    may: BTreeSet<MemoryIndex>,
}

impl AliasSet {
    pub fn must(&self) -> &BTreeSet<MemoryIndex> {
        &self.must
    }

    pub fn may(&self) -> &BTreeSet<MemoryIndex> {
        &self.may
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.may.is_empty()
    }

    pub fn contains(&self, index: &MemoryIndex) -> bool {
        self.must.contains(index) || self.may.contains(index)
    }

    pub fn strength(&self, index: &MemoryIndex) -> Option<AliasStrength> {
        if self.must.contains(index) {
            Some(AliasStrength::Must)
        } else if self.may.contains(index) {
            Some(AliasStrength::May)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryIndex> {
        self.must.iter().chain(self.may.iter())
    }

    pub fn insert_must(&mut self, index: MemoryIndex) -> Result<(), MemoryError> {
        if self.may.contains(&index) {
            return Err(MemoryError::ConflictingAlias(index));
        }
        self.must.insert(index);
        Ok(())
    }

    pub fn insert_may(&mut self, index: MemoryIndex) -> Result<(), MemoryError> {
        if self.must.contains(&index) {
            return Err(MemoryError::ConflictingAlias(index));
        }
        self.may.insert(index);
        Ok(())
    }

    /// Record `index` with exactly the given strength, replacing any previous one.
    pub fn set(&mut self, index: MemoryIndex, strength: AliasStrength) {
        self.remove(&index);
        match strength {
            AliasStrength::Must => self.must.insert(index),
            AliasStrength::May => self.may.insert(index),
        };
    }

    pub fn remove(&mut self, index: &MemoryIndex) -> bool {
        self.must.remove(index) | self.may.remove(index)
    }

    /// Turn every must-alias into a may-alias.
    pub fn degrade(&mut self) {
        let must = std::mem::take(&mut self.must);
        self.may.extend(must);
    }

    /// Bind this index to `target` with the degrade-on-reassignment rule: the
    /// first binding is a must-alias; binding an index that already has
    /// aliases degrades all of them and adds `target` as a may-alias. Binding
    /// an existing must-alias again changes nothing.
    ///
    /// Returns the strength the edge to `target` ends up with.
    pub fn bind(&mut self, target: MemoryIndex) -> AliasStrength {
        if self.must.contains(&target) {
            return AliasStrength::Must;
        }
        if self.is_empty() {
            self.must.insert(target);
            return AliasStrength::Must;
        }
        self.degrade();
        self.may.insert(target);
        AliasStrength::May
    }

    /// Combine the alias sets an index has in several snapshots. An alias is a
    /// must-alias only if it is one in every source; everything else any source
    /// knows becomes a may-alias. `None` stands for a source without aliases.
    pub fn merge<'a, I>(sources: I) -> Result<AliasSet, MemoryError>
    where
        I: IntoIterator<Item = Option<&'a AliasSet>>,
    {
        let mut must: Option<BTreeSet<MemoryIndex>> = None;
        let mut all = BTreeSet::new();
        for source in sources {
            let (source_must, source_all): (BTreeSet<MemoryIndex>, BTreeSet<MemoryIndex>) = match source {
                Some(set) => (set.must.clone(), set.iter().copied().collect()),
                None => (BTreeSet::new(), BTreeSet::new()),
            };
            must = Some(match must {
                None => source_must,
                Some(m) => m.intersection(&source_must).copied().collect(),
            });
            all.extend(source_all);
        }
        let mut merged = AliasSet::default();
        for index in must.unwrap_or_default() {
            merged.insert_must(index)?;
        }
        for index in all {
            if !merged.must.contains(&index) {
                merged.insert_may(index)?;
            }
        }
        Ok(merged)
    }
}
