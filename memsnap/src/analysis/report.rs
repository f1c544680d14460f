use crate::analysis::{CallContext, ContextId, ProgramPoint};
use crate::snapshot::{Snapshot, SnapshotStatistics};
use crate::value::InfoValue;
use memsnap_cfg::Function;
use std::collections::{BTreeMap, BTreeSet};

/// The frozen snapshots of a finished analysis run.
#[derive(Debug)]
pub struct AnalysisResult<'p> {
    pub(crate) contexts: Vec<CallContext<'p>>,
    pub(crate) snapshots: BTreeMap<ProgramPoint, Snapshot>,
    pub(crate) steps: usize,
}

impl<'p> AnalysisResult<'p> {
    /// Number of program points processed before the fixpoint was reached.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn contexts(&self) -> impl Iterator<Item = (ContextId, &CallContext<'p>)> {
        self.contexts
            .iter()
            .enumerate()
            .map(|(i, c)| (ContextId(i), c))
    }

    pub fn context(&self, id: ContextId) -> Option<&CallContext<'p>> {
        self.contexts.get(id.0)
    }

    fn function(&self, id: ContextId) -> Option<&'p Function> {
        self.context(id).map(|c| c.function)
    }

    pub fn snapshot(&self, point: ProgramPoint) -> Option<&Snapshot> {
        self.snapshots.get(&point)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (&ProgramPoint, &Snapshot)> {
        self.snapshots.iter()
    }

    /// The snapshot after the node labelled `label` of the script's top level.
    pub fn main_snapshot(&self, label: usize) -> Option<&Snapshot> {
        let cfg = &self.function(ContextId::MAIN)?.cfg;
        self.snapshot(ProgramPoint::new(ContextId::MAIN, cfg.index_of(label)?))
    }

    /// The snapshot at the end of the script, if its exit is reachable.
    pub fn exit(&self) -> Option<&Snapshot> {
        let cfg = &self.function(ContextId::MAIN)?.cfg;
        self.snapshot(ProgramPoint::new(ContextId::MAIN, cfg.exit()))
    }

    /// Every finding that reaches the end of the script, without duplicates.
    pub fn warnings(&self) -> Vec<InfoValue> {
        let found: BTreeSet<InfoValue> = self
            .exit()
            .map(|s| s.warnings().into_iter().collect())
            .unwrap_or_default();
        found.into_iter().collect()
    }

    /// The counters of every snapshot, summed.
    pub fn statistics(&self) -> SnapshotStatistics {
        let mut total = SnapshotStatistics::default();
        for snapshot in self.snapshots.values() {
            total.absorb(&snapshot.statistics());
        }
        total
    }
}
