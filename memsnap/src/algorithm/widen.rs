use crate::lattice::Widen;
use crate::memory::{MemoryEntry, MemoryIndex};
use crate::snapshot::{Snapshot, SnapshotData, StatisticKind};
use tracing::trace;

impl Snapshot {
    /// Widen every entry that changed since `previous`. Returns how many
    /// entries were rewritten.
    ///
    /// Widening only touches scalars and intervals, so the structure (arrays,
    /// objects, aliases) stays in step with the data.
    pub(crate) fn widen_against(&mut self, previous: &SnapshotData) -> usize {
        let widened: Vec<(MemoryIndex, MemoryEntry)> = self
            .data()
            .iter()
            .filter_map(|(index, entry)| {
                let old = previous.entry(index)?;
                if old == entry {
                    return None;
                }
                let w = entry.widen(old);
                (w != *entry).then_some((*index, w))
            })
            .collect();
        let count = widened.len();
        for (index, entry) in widened {
            trace!("widening {}", index);
            self.record(StatisticKind::Widening);
            self.data_mut().entries.insert(index, entry);
        }
        count
    }
}
