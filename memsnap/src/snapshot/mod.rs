//! Transactional memory state of one program point.

mod data;
mod stats;
mod structure;
#[cfg(test)]
mod tests;

pub use data::SnapshotData;
pub use stats::{SnapshotStatistics, StatisticKind};
pub use structure::SnapshotStructure;

use crate::error::MemoryError;
use crate::memory::{AliasSet, IndexDefinition, MemoryEntry, MemoryIndex};
use crate::value::ValueFactory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

/// Precision limits. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Commits after which changed entries are widened.
    pub widening_limit: Option<usize>,
    /// Scalar values an entry may hold before collapsing to kind-level values.
    pub simplify_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    Fresh,
    TransactionOpen,
    Committed,
    Frozen,
}

#[derive(Debug, Clone)]
struct SavedState {
    structure: Arc<SnapshotStructure>,
    data: Arc<SnapshotData>,
    state: SnapshotState,
}

/// The abstract memory at one program point.
///
/// Content is split into a [`SnapshotStructure`] and a [`SnapshotData`], both
/// behind an `Arc` and written through `Arc::make_mut`, so a snapshot extended
/// from a single predecessor shares that predecessor's maps until it first
/// writes.
///
/// All mutation happens inside a transaction:
///
/// ```text
/// Fresh -> start -> TransactionOpen -> commit -> Committed -> start -> ...
///                                                Committed -> freeze -> Frozen
/// ```
///
/// A mutation that fails aborts the transaction and restores the content the
/// snapshot had when it was started.
#[derive(Debug, Clone)]
pub struct Snapshot {
    config: SnapshotConfig,
    structure: Arc<SnapshotStructure>,
    data: Arc<SnapshotData>,
    state: SnapshotState,
    saved: Option<SavedState>,
    commit_count: usize,
    changed: bool,
    statistics: SnapshotStatistics,
}

fn same<T: PartialEq>(a: &Arc<T>, b: &Arc<T>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

impl Snapshot {
    pub fn new(config: SnapshotConfig) -> Self {
        let mut structure = SnapshotStructure::default();
        let mut data = SnapshotData::default();
        let diagnostics = MemoryIndex::diagnostics();
        structure
            .definitions
            .insert(diagnostics, IndexDefinition::default());
        data.entries.insert(diagnostics, MemoryEntry::new());
        Self {
            config,
            structure: Arc::new(structure),
            data: Arc::new(data),
            state: SnapshotState::Fresh,
            saved: None,
            commit_count: 0,
            changed: false,
            statistics: SnapshotStatistics::default(),
        }
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn state(&self) -> SnapshotState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == SnapshotState::Frozen
    }

    pub fn commit_count(&self) -> usize {
        self.commit_count
    }

    /// Whether the last commit changed the snapshot's content.
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// A copy of the usage counters.
    pub fn statistics(&self) -> SnapshotStatistics {
        self.statistics.clone()
    }

    pub fn call_level(&self) -> usize {
        self.structure.call_level
    }

    pub fn structure(&self) -> &SnapshotStructure {
        &self.structure
    }

    pub fn data(&self) -> &SnapshotData {
        &self.data
    }

    pub fn values(&mut self) -> ValueFactory<'_> {
        ValueFactory::new(&mut self.statistics)
    }

    pub fn exists(&self, index: &MemoryIndex) -> bool {
        self.structure.contains(index)
    }

    pub fn aliases(&self, index: &MemoryIndex) -> Option<&AliasSet> {
        self.structure.aliases(index)
    }

    pub fn must_alias(&self, index: &MemoryIndex, other: &MemoryIndex) -> bool {
        self.aliases(index)
            .is_some_and(|a| a.must().contains(other))
    }

    pub fn may_alias(&self, index: &MemoryIndex, other: &MemoryIndex) -> bool {
        self.aliases(index).is_some_and(|a| a.may().contains(other))
    }

    pub fn start_transaction(&mut self) -> Result<(), MemoryError> {
        match self.state {
            SnapshotState::Frozen => return Err(MemoryError::Frozen),
            SnapshotState::TransactionOpen => return Err(MemoryError::TransactionAlreadyOpen),
            SnapshotState::Fresh | SnapshotState::Committed => {}
        }
        self.saved = Some(SavedState {
            structure: self.structure.clone(),
            data: self.data.clone(),
            state: self.state,
        });
        self.state = SnapshotState::TransactionOpen;
        self.statistics.record(StatisticKind::StartTransaction);
        trace!("transaction {} started", self.commit_count + 1);
        Ok(())
    }

    /// Close the open transaction. Returns whether the content differs from
    /// what it was when the transaction started.
    pub fn commit_transaction(&mut self) -> Result<bool, MemoryError> {
        self.ensure_open()?;
        let saved = self.saved.take().ok_or(MemoryError::TransactionNotOpen)?;
        self.commit_count += 1;
        self.statistics.record(StatisticKind::CommitTransaction);

        let content_changed =
            !(same(&self.structure, &saved.structure) && same(&self.data, &saved.data));
        if content_changed
            && self
                .config
                .widening_limit
                .is_some_and(|limit| self.commit_count > limit)
        {
            let widened = self.widen_against(&saved.data);
            if widened > 0 {
                debug!(
                    "widened {} entries after {} commits",
                    widened, self.commit_count
                );
            }
        }

        self.changed =
            !(same(&self.structure, &saved.structure) && same(&self.data, &saved.data));
        self.state = SnapshotState::Committed;
        trace!(
            "transaction {} committed, changed: {}",
            self.commit_count, self.changed
        );
        Ok(self.changed)
    }

    /// Permanently forbid further transactions. Freezing twice is allowed.
    pub fn freeze(&mut self) -> Result<(), MemoryError> {
        if self.state == SnapshotState::TransactionOpen {
            return Err(MemoryError::FreezeDuringTransaction);
        }
        self.state = SnapshotState::Frozen;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), MemoryError> {
        match self.state {
            SnapshotState::TransactionOpen => Ok(()),
            SnapshotState::Frozen => Err(MemoryError::Frozen),
            SnapshotState::Fresh | SnapshotState::Committed => Err(MemoryError::TransactionNotOpen),
        }
    }

    /// Run one mutating operation inside the open transaction, aborting the
    /// transaction if it fails.
    pub(crate) fn mutate<T, F>(&mut self, kind: StatisticKind, op: F) -> Result<T, MemoryError>
    where
        F: FnOnce(&mut Self) -> Result<T, MemoryError>,
    {
        self.ensure_open()?;
        self.statistics.record(kind);
        match op(self) {
            Ok(result) => Ok(result),
            Err(e) => {
                self.abort();
                debug!("transaction aborted: {}", e);
                Err(e)
            }
        }
    }

    fn abort(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.structure = saved.structure;
            self.data = saved.data;
            self.state = saved.state;
        }
    }

    pub(crate) fn record(&mut self, kind: StatisticKind) {
        self.statistics.record(kind);
    }

    pub(crate) fn structure_mut(&mut self) -> &mut SnapshotStructure {
        Arc::make_mut(&mut self.structure)
    }

    pub(crate) fn data_mut(&mut self) -> &mut SnapshotData {
        Arc::make_mut(&mut self.data)
    }

    pub(crate) fn share(&mut self, other: &Snapshot) {
        self.structure = other.structure.clone();
        self.data = other.data.clone();
    }

    pub(crate) fn replace(&mut self, structure: SnapshotStructure, data: SnapshotData) {
        self.structure = Arc::new(structure);
        self.data = Arc::new(data);
    }

    pub(crate) fn simplify_limit(&self) -> Option<usize> {
        self.config.simplify_limit
    }
}
