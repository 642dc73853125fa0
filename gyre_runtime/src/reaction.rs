use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::SlotMap;

use crate::{ReactionKey, Scheduler, Tag, WorkerId};

/// Execution level. All of a reaction's logical predecessors have
/// strictly smaller levels.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Level(pub usize);

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl From<usize> for Level {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl std::ops::Add<usize> for Level {
    type Output = Self;

    fn add(self, rhs: usize) -> Self::Output {
        Self(self.0 + rhs)
    }
}

impl std::ops::AddAssign<usize> for Level {
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

const TIEBREAKER_BITS: u32 = 48;
const TIEBREAKER_MASK: u64 = (1 << TIEBREAKER_BITS) - 1;

/// 64-bit dispatch key for a reaction: the upper 16 bits hold the
/// precedence [`Level`], the lower 48 bits a deadline tiebreaker.
/// Ordering the full key ascending therefore orders by level first and
/// earliest deadline second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReactionIndex(u64);

impl ReactionIndex {
    pub fn new(level: Level, tiebreaker: u64) -> Self {
        debug_assert!(level.0 < (1 << 16), "level out of range");
        debug_assert!(tiebreaker <= TIEBREAKER_MASK, "tiebreaker out of range");
        Self(((level.0 as u64) << TIEBREAKER_BITS) | (tiebreaker & TIEBREAKER_MASK))
    }

    pub fn level(&self) -> Level {
        Level((self.0 >> TIEBREAKER_BITS) as usize)
    }

    pub fn tiebreaker(&self) -> u64 {
        self.0 & TIEBREAKER_MASK
    }
}

impl std::fmt::Display for ReactionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.level(), self.tiebreaker())
    }
}

/// Dispatch status of a reaction at the current tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReactionStatus {
    /// Not admitted at the current tag; a trigger may claim it.
    Inactive = 0,
    /// Admitted for execution at the current tag.
    Queued = 1,
    /// Dispatched to a worker.
    Running = 2,
}

impl ReactionStatus {
    fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Inactive,
            1 => Self::Queued,
            _ => Self::Running,
        }
    }
}

/// Atomic status cell enforcing the single-fire discipline. All
/// transitions are compare-and-swap: the cell, not the ready queue, is
/// what resolves the multi-triggerer race.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU32);

impl StatusCell {
    pub fn new() -> Self {
        Self(AtomicU32::new(ReactionStatus::Inactive as u32))
    }

    /// Inactive -> Queued. Returns true iff this caller won the
    /// admission race.
    pub fn admit(&self) -> bool {
        self.0
            .compare_exchange(
                ReactionStatus::Inactive as u32,
                ReactionStatus::Queued as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Queued -> Inactive, performed by the worker that popped the
    /// reaction once its body has returned. Any other observed state is
    /// a contract violation reported to the caller.
    pub fn retire(&self) -> Result<(), ReactionStatus> {
        self.0
            .compare_exchange(
                ReactionStatus::Queued as u32,
                ReactionStatus::Inactive as u32,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(ReactionStatus::from_raw)
    }

    pub fn load(&self) -> ReactionStatus {
        ReactionStatus::from_raw(self.0.load(Ordering::Acquire))
    }
}

/// Execution context handed to a reaction body.
pub struct ReactionCtx<'a> {
    pub(crate) scheduler: &'a Scheduler,
    pub(crate) worker: WorkerId,
    pub(crate) tag: Tag,
}

impl ReactionCtx<'_> {
    /// The tag this reaction fires at.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Admit a downstream reaction at the current tag. A no-op if it was
    /// already admitted.
    pub fn trigger(&self, key: ReactionKey) {
        self.scheduler.trigger_reaction(key, self.worker);
    }
}

pub trait ReactionFn: Fn(&ReactionCtx) + Send + Sync {}
impl<F> ReactionFn for F where F: Fn(&ReactionCtx) + Send + Sync {}

/// An atomic unit of user code scheduled by the runtime. A reaction
/// lives for the entire run; only its status transitions.
pub struct Reaction {
    /// Debug name
    name: String,
    index: ReactionIndex,
    status: StatusCell,
    /// Reaction body
    body: Box<dyn ReactionFn>,
}

impl std::fmt::Debug for Reaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reaction")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("status", &self.status.load())
            .finish_non_exhaustive()
    }
}

impl Reaction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> ReactionIndex {
        self.index
    }

    pub fn level(&self) -> Level {
        self.index.level()
    }

    pub fn status(&self) -> ReactionStatus {
        self.status.load()
    }

    pub(crate) fn status_cell(&self) -> &StatusCell {
        &self.status
    }

    pub(crate) fn execute(&self, ctx: &ReactionCtx) {
        (self.body)(ctx);
    }
}

/// Arena of all reactions known to a scheduler. Populated before the
/// worker pool starts and immutable afterwards; the scheduler and the
/// workers refer to reactions by key only.
#[derive(Default)]
pub struct ReactionRegistry {
    reactions: SlotMap<ReactionKey, Reaction>,
    /// Next deadline tiebreaker, per level.
    next_tiebreaker: Vec<u64>,
}

impl std::fmt::Debug for ReactionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.reactions.iter().map(|(key, r)| (key, r.name())))
            .finish()
    }
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reaction at the given level. The deadline tiebreaker is
    /// assigned in registration order within the level.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        level: Level,
        body: impl ReactionFn + 'static,
    ) -> ReactionKey {
        if self.next_tiebreaker.len() <= level.0 {
            self.next_tiebreaker.resize(level.0 + 1, 0);
        }
        let tiebreaker = self.next_tiebreaker[level.0];
        self.next_tiebreaker[level.0] += 1;
        self.register_at(name, ReactionIndex::new(level, tiebreaker), body)
    }

    /// Register a reaction with an explicit dispatch index.
    pub fn register_at(
        &mut self,
        name: impl Into<String>,
        index: ReactionIndex,
        body: impl ReactionFn + 'static,
    ) -> ReactionKey {
        self.reactions.insert(Reaction {
            name: name.into(),
            index,
            status: StatusCell::new(),
            body: Box::new(body),
        })
    }

    pub fn get(&self, key: ReactionKey) -> Option<&Reaction> {
        self.reactions.get(key)
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReactionKey, &Reaction)> {
        self.reactions.iter()
    }

    /// Return the maximum reaction level
    pub fn max_level(&self) -> Level {
        self.reactions
            .values()
            .map(|reaction| reaction.level())
            .max()
            .unwrap_or_default()
    }

    /// Reaction counts per level, indexed 0..=max_level.
    pub fn num_reactions_per_level(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_level().0 + 1];
        for reaction in self.reactions.values() {
            counts[reaction.level().0] += 1;
        }
        counts
    }
}

impl std::ops::Index<ReactionKey> for ReactionRegistry {
    type Output = Reaction;

    fn index(&self, key: ReactionKey) -> &Self::Output {
        &self.reactions[key]
    }
}
