use crate::lattice::Widen;
use crate::value::{F64, Scalar};
use memsnap_cfg::ValueKind;

/// An interval endpoint. The derived order puts `NegInf` below every finite
/// bound and `PosInf` above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bound<T> {
    NegInf,
    Finite(T),
    PosInf,
}

/// A closed numeric range. Construction does not check `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Interval {
    Integer { start: Bound<i64>, end: Bound<i64> },
    Float { start: Bound<F64>, end: Bound<F64> },
}

impl Interval {
    pub fn integer(start: i64, end: i64) -> Self {
        Interval::Integer {
            start: Bound::Finite(start),
            end: Bound::Finite(end),
        }
    }

    pub fn float(start: f64, end: f64) -> Self {
        Interval::Float {
            start: Bound::Finite(F64(start)),
            end: Bound::Finite(F64(end)),
        }
    }

    /// `(-inf, +inf)` of a numeric kind.
    pub fn unbounded(kind: ValueKind) -> Option<Self> {
        match kind {
            ValueKind::Integer => Some(Interval::Integer {
                start: Bound::NegInf,
                end: Bound::PosInf,
            }),
            ValueKind::Float => Some(Interval::Float {
                start: Bound::NegInf,
                end: Bound::PosInf,
            }),
            _ => None,
        }
    }

    /// The degenerate interval holding exactly one numeric scalar.
    pub fn point(scalar: &Scalar) -> Option<Self> {
        match scalar {
            Scalar::Integer(i) => Some(Interval::integer(*i, *i)),
            Scalar::Float(f) => Some(Interval::float(f.0, f.0)),
            _ => None,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Interval::Integer { .. } => ValueKind::Integer,
            Interval::Float { .. } => ValueKind::Float,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        match self {
            Interval::Integer { start, end } => *start == Bound::NegInf && *end == Bound::PosInf,
            Interval::Float { start, end } => *start == Bound::NegInf && *end == Bound::PosInf,
        }
    }

    /// The smallest interval covering both, if they share a kind.
    pub fn hull(&self, other: &Interval) -> Option<Interval> {
        match (self, other) {
            (
                Interval::Integer { start: s1, end: e1 },
                Interval::Integer { start: s2, end: e2 },
            ) => Some(Interval::Integer {
                start: *s1.min(s2),
                end: *e1.max(e2),
            }),
            (Interval::Float { start: s1, end: e1 }, Interval::Float { start: s2, end: e2 }) => {
                Some(Interval::Float {
                    start: *s1.min(s2),
                    end: *e1.max(e2),
                })
            }
            _ => None,
        }
    }

    pub fn contains(&self, other: &Interval) -> bool {
        match (self, other) {
            (
                Interval::Integer { start: s1, end: e1 },
                Interval::Integer { start: s2, end: e2 },
            ) => s1 <= s2 && e2 <= e1,
            (Interval::Float { start: s1, end: e1 }, Interval::Float { start: s2, end: e2 }) => {
                s1 <= s2 && e2 <= e1
            }
            _ => false,
        }
    }

    pub fn contains_scalar(&self, scalar: &Scalar) -> bool {
        Interval::point(scalar).is_some_and(|p| self.contains(&p))
    }
}

fn widen_bounds<T: Ord + Copy>(
    start: Bound<T>,
    end: Bound<T>,
    prev_start: Bound<T>,
    prev_end: Bound<T>,
) -> (Bound<T>, Bound<T>) {
    let start = if start < prev_start {
        Bound::NegInf
    } else {
        prev_start.min(start)
    };
    let end = if end > prev_end {
        Bound::PosInf
    } else {
        prev_end.max(end)
    };
    (start, end)
}

impl Widen for Interval {
    fn widen(&self, previous: &Self) -> Self {
        match (self, previous) {
            (
                Interval::Integer { start, end },
                Interval::Integer {
                    start: prev_start,
                    end: prev_end,
                },
            ) => {
                let (start, end) = widen_bounds(*start, *end, *prev_start, *prev_end);
                Interval::Integer { start, end }
            }
            (
                Interval::Float { start, end },
                Interval::Float {
                    start: prev_start,
                    end: prev_end,
                },
            ) => {
                let (start, end) = widen_bounds(*start, *end, *prev_start, *prev_end);
                Interval::Float { start, end }
            }
            // a kind change is a jump to the top of the new kind
            _ => Interval::unbounded(self.kind()).unwrap_or(*self),
        }
    }
}
