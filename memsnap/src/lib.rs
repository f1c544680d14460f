pub mod algorithm;
pub mod analysis;
pub mod display;
mod error;
pub mod lattice;
pub mod memory;
pub mod snapshot;
pub mod value;

pub use memsnap_cfg as cfg;

pub use algorithm::CollectedIndices;
pub use error::{AnalysisError, MemoryError};
pub use memory::{AliasSet, AliasStrength, MemoryEntry, MemoryIndex};
pub use snapshot::{Snapshot, SnapshotConfig, SnapshotState, SnapshotStatistics, StatisticKind};
pub use value::{InfoValue, Value, ValueFactory, WarningCause};
