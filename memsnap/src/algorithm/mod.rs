//! The operations of [`Snapshot`](crate::snapshot::Snapshot): path resolution,
//! reads, writes, merges and widening. Each file adds one group of methods.

mod assign;
mod collect;
mod copy;
mod merge;
mod read;
mod widen;

pub use collect::CollectedIndices;
