use parking_lot::Mutex;

use crate::{Tag, Timestamp};

/// Mirror of the scheduler's current tag, readable without the
/// environment lock. Written only during tag advance, while every worker
/// is idle; watchdogs read it to anchor their deadlines.
#[derive(Debug)]
pub struct LogicalClock {
    /// Physical time the run started.
    start_time: Timestamp,
    tag: Mutex<Tag>,
}

impl LogicalClock {
    pub fn new(start_time: Timestamp) -> Self {
        Self {
            start_time,
            tag: Mutex::new(Tag::ZERO),
        }
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    /// The tag currently being executed.
    pub fn tag(&self) -> Tag {
        *self.tag.lock()
    }

    /// Current logical time as an instant.
    pub fn logical_now(&self) -> Timestamp {
        self.tag.lock().to_logical_time(self.start_time)
    }

    /// Current physical time.
    pub fn physical_now(&self) -> Timestamp {
        Timestamp::now()
    }

    pub(crate) fn advance_to(&self, tag: Tag) {
        *self.tag.lock() = tag;
    }
}
