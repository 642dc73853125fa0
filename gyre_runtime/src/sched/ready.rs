use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::queue::{QueueEntry, ReactionQueue};
use crate::Level;

/// One ready queue per precedence level, plus the level cursor and the
/// index of the queue workers are currently draining.
///
/// Each queue has a dedicated mutex held only across insert and pop.
/// `next_level` and `executing` are written only by the last-idle worker
/// while every other worker is parked on the semaphore.
#[derive(Debug)]
pub(crate) struct ReadyTable {
    levels: Box<[Mutex<ReactionQueue>]>,
    /// Next level to inspect when distributing.
    next_level: AtomicUsize,
    /// Level the workers pop from.
    executing: AtomicUsize,
}

impl ReadyTable {
    /// One queue per level, sized from the per-level reaction counts.
    pub fn new(capacities: &[usize]) -> Self {
        assert!(!capacities.is_empty(), "at least one level is required");
        let levels = capacities
            .iter()
            .map(|&capacity| Mutex::new(ReactionQueue::with_capacity(capacity)))
            .collect();
        Self {
            levels,
            next_level: AtomicUsize::new(0),
            executing: AtomicUsize::new(0),
        }
    }

    pub fn max_level(&self) -> Level {
        Level(self.levels.len() - 1)
    }

    /// Insert into the queue for the entry's own level.
    pub fn insert(&self, entry: QueueEntry) {
        let level = entry.index.level();
        self.levels[level.0].lock().push(entry);
    }

    /// Pop the earliest-deadline entry from the executing queue.
    pub fn pop_executing(&self) -> Option<QueueEntry> {
        let level = self.executing.load(Ordering::Acquire);
        self.levels[level].lock().pop()
    }

    pub fn level_len(&self, level: Level) -> usize {
        self.levels[level.0].lock().len()
    }

    pub fn cursor(&self) -> Level {
        Level(self.next_level.load(Ordering::Acquire))
    }

    pub fn set_cursor(&self, level: Level) {
        self.next_level.store(level.0, Ordering::Release);
    }

    pub fn reset_cursor(&self) {
        self.next_level.store(0, Ordering::Release);
    }

    pub fn set_executing(&self, level: Level) {
        self.executing.store(level.0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ReactionIndex, ReactionKey};
    use slotmap::SlotMap;

    #[test]
    fn test_insert_routes_by_level() {
        let mut arena: SlotMap<ReactionKey, ()> = SlotMap::with_key();
        let k0 = arena.insert(());
        let k1 = arena.insert(());

        let table = ReadyTable::new(&[4, 4, 4]);
        table.insert(QueueEntry {
            index: ReactionIndex::new(Level(2), 0),
            key: k0,
        });
        table.insert(QueueEntry {
            index: ReactionIndex::new(Level(0), 0),
            key: k1,
        });

        assert_eq!(table.level_len(Level(0)), 1);
        assert_eq!(table.level_len(Level(1)), 0);
        assert_eq!(table.level_len(Level(2)), 1);

        // The executing queue starts at level 0.
        assert_eq!(table.pop_executing().map(|e| e.key), Some(k1));
        assert_eq!(table.pop_executing(), None);

        table.set_executing(Level(2));
        assert_eq!(table.pop_executing().map(|e| e.key), Some(k0));
    }
}
