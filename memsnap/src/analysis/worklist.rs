use crate::analysis::ProgramPoint;
use std::collections::{HashSet, VecDeque};

/// FIFO queue of program points awaiting (re)processing. A point is queued at
/// most once at a time.
#[derive(Debug, Default)]
pub struct Worklist {
    queue: VecDeque<ProgramPoint>,
    queued: HashSet<ProgramPoint>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `point` was already waiting.
    pub fn push(&mut self, point: ProgramPoint) -> bool {
        if !self.queued.insert(point) {
            return false;
        }
        self.queue.push_back(point);
        true
    }

    pub fn pop(&mut self) -> Option<ProgramPoint> {
        let point = self.queue.pop_front()?;
        self.queued.remove(&point);
        Some(point)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
