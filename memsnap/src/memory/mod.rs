//! Storage locations, their aliasing and per-location value sets.

mod alias;
mod definition;
mod entry;
mod index;

pub use alias::{AliasSet, AliasStrength};
pub use definition::{ArrayDescriptor, IndexDefinition, ObjectDescriptor};
pub use entry::MemoryEntry;
pub use index::{IndexNode, IndexSegment, MemoryIndex, VariableScope};
