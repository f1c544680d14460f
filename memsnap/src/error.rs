use crate::memory::MemoryIndex;
use memsnap_cfg::CfgError;
use thiserror::Error;

/// A breach of the snapshot contract by the caller. These never describe a
/// property of the analysed program; they abort the open transaction and stop
/// the analysis run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("a transaction is already open on this snapshot")]
    TransactionAlreadyOpen,
    #[error("snapshot mutation attempted without an open transaction")]
    TransactionNotOpen,
    #[error("snapshot is frozen and can no longer be modified")]
    Frozen,
    #[error("cannot freeze a snapshot while a transaction is open")]
    FreezeDuringTransaction,
    /// An operation required an index that the snapshot does not define
    #[error("required index {0} does not exist in this snapshot")]
    MissingIndex(MemoryIndex),
    #[error("alias values describe references and cannot be stored as data")]
    AliasAsData,
    #[error("snapshots from different call levels cannot be merged: expected {expected}, found {found}")]
    CallLevelMismatch { expected: usize, found: usize },
    #[error("no call frame to close")]
    NoCallFrame,
    /// Must- and may-alias sets are kept disjoint; this insertion would break that
    #[error("index {0} cannot be both a must-alias and a may-alias")]
    ConflictingAlias(MemoryIndex),
    #[error("extend needs at least one source snapshot")]
    NoSources,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("memory model contract violated")]
    Memory(#[from] MemoryError),
    #[error("malformed program")]
    Cfg(#[from] CfgError),
    /// The driver's step budget ran out before a fixpoint was reached
    #[error("no fixpoint after {0} steps")]
    FuelExhausted(usize),
}
