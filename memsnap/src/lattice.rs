/// A join semi-lattice: `join` moves `self` up to the least upper bound of
/// both operands, and `PartialOrd` is the lattice order.
pub trait JoinSemiLattice: Eq + PartialOrd {
    fn join(&mut self, other: &Self);
}

/// Widening accelerates an ascending chain: `self.widen(previous)` is at
/// least `self` and drops whatever grew since `previous`.
pub trait Widen {
    fn widen(&self, previous: &Self) -> Self;
}
