use std::collections::BinaryHeap;

use crate::{ReactionIndex, ReactionKey};

/// An admitted reaction awaiting dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct QueueEntry {
    pub index: ReactionIndex,
    pub key: ReactionKey,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap; reverse for min-heap behavior.
        // Same-index entries are commutative, the key only totalizes
        // the order.
        self.index
            .cmp(&other.index)
            .then_with(|| self.key.cmp(&other.key))
            .reverse()
    }
}

/// Priority queue of admitted reactions, ordered by index ascending
/// (lower index = earlier deadline). Duplicate suppression is the status
/// cell's job, not the queue's.
#[derive(Debug, Default)]
pub(crate) struct ReactionQueue(BinaryHeap<QueueEntry>);

impl ReactionQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self(BinaryHeap::with_capacity(capacity))
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.0.push(entry);
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
