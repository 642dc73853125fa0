use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use parking_lot::Mutex;

use super::{queue::QueueEntry, ready::ReadyTable, semaphore::Semaphore, Config, SchedError};
use crate::{
    Level, LogicalClock, ReactionKey, ReactionRegistry, ReactionStatus, Tag, Timestamp, WorkerId,
    DEFAULT_MAX_LEVEL,
};

/// Source of tag advances for the scheduler.
///
/// Both methods are called only while every worker is idle, so the
/// implementation never races with executing reactions. `advance_tag` is
/// called with the environment lock held and must not re-enter the
/// scheduler other than through the provided context.
pub trait EventLoop: Send {
    /// Move logical time to the next tag and admit that tag's reactions
    /// through `ctx`. Returns the new tag, or `None` once the stop tag
    /// has been reached.
    fn advance_tag(&mut self, ctx: &mut AdvanceCtx<'_>) -> Option<Tag>;

    /// Chance to skip levels known to be empty before the scheduler
    /// inspects `next_level`. The cursor may only move up; downward
    /// moves are ignored.
    fn try_advance_level(&mut self, _next_level: &mut Level) {}
}

/// Restricted scheduler view handed to [`EventLoop::advance_tag`].
pub struct AdvanceCtx<'a> {
    sched: &'a Scheduler,
}

impl AdvanceCtx<'_> {
    /// Admit a reaction for the tag being advanced to.
    pub fn trigger(&self, key: ReactionKey) {
        self.sched.trigger_reaction(key, WorkerId::ANONYMOUS);
    }

    /// The tag the scheduler just finished executing.
    pub fn current_tag(&self) -> Tag {
        self.sched.clock.tag()
    }
}

/// Level-synchronized GEDF-NP scheduler core.
///
/// Worker threads loop on [`Scheduler::get_ready_reaction`]; the worker
/// whose idle increment makes the idle count equal to the pool size is
/// elected to advance the level, or past the last level, the tag. All
/// other idle workers park on the semaphore until the next distribution
/// releases them.
pub struct Scheduler {
    registry: Arc<ReactionRegistry>,
    ready: ReadyTable,
    /// The environment lock, held across tag advances and never across
    /// reaction bodies.
    event_loop: Mutex<Box<dyn EventLoop>>,
    clock: Arc<LogicalClock>,
    workers: u32,
    number_of_idle_workers: AtomicU32,
    should_stop: AtomicBool,
    semaphore: Semaphore,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .field("ready", &self.ready)
            .field("workers", &self.workers)
            .field(
                "number_of_idle_workers",
                &self.number_of_idle_workers.load(Ordering::Relaxed),
            )
            .field("should_stop", &self.should_stop.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        registry: Arc<ReactionRegistry>,
        event_loop: Box<dyn EventLoop>,
        config: &Config,
    ) -> Result<Arc<Self>, SchedError> {
        if config.workers == 0 {
            return Err(SchedError::NoWorkers);
        }
        let capacities = match &config.num_reactions_per_level {
            Some(counts) if !counts.is_empty() => counts.clone(),
            _ if !registry.is_empty() => registry.num_reactions_per_level(),
            _ => vec![0; DEFAULT_MAX_LEVEL + 1],
        };
        tracing::debug!(
            workers = config.workers,
            max_level = capacities.len() - 1,
            "Creating scheduler"
        );
        Ok(Arc::new(Self {
            registry,
            ready: ReadyTable::new(&capacities),
            event_loop: Mutex::new(event_loop),
            clock: Arc::new(LogicalClock::new(Timestamp::now())),
            workers: config.workers as u32,
            number_of_idle_workers: AtomicU32::new(0),
            should_stop: AtomicBool::new(false),
            semaphore: Semaphore::new(0),
        }))
    }

    pub fn registry(&self) -> &Arc<ReactionRegistry> {
        &self.registry
    }

    pub fn clock(&self) -> &Arc<LogicalClock> {
        &self.clock
    }

    /// The tag currently being executed.
    pub fn current_tag(&self) -> Tag {
        self.clock.tag()
    }

    pub(crate) fn workers(&self) -> usize {
        self.workers as usize
    }

    pub fn should_stop(&self) -> bool {
        self.should_stop.load(Ordering::Acquire)
    }

    /// Block until a reaction is ready for this worker, or return `None`
    /// once the scheduler has stopped.
    ///
    /// The returned reaction is still `Queued`; the caller must execute
    /// its body and then call [`Scheduler::done_with_reaction`].
    #[tracing::instrument(level = "trace", skip(self), fields(worker = %worker))]
    pub fn get_ready_reaction(&self, worker: WorkerId) -> Option<ReactionKey> {
        while !self.should_stop() {
            if let Some(entry) = self.ready.pop_executing() {
                tracing::trace!(index = %entry.index, "Popped ready reaction");
                return Some(entry.key);
            }

            let idle = self.number_of_idle_workers.fetch_add(1, Ordering::AcqRel) + 1;
            if idle == self.workers {
                // Last worker to go idle: the executing queue is drained,
                // so this worker alone drives the level/tag advance.
                self.try_advance_tag_and_distribute();
            } else {
                self.semaphore.acquire();
            }
        }
        None
    }

    /// Mark a popped reaction as completed. Fatal if the reaction was
    /// not in the `Queued` state: a lost or duplicated reaction cannot
    /// be reconciled with deterministic execution.
    pub fn done_with_reaction(&self, worker: WorkerId, key: ReactionKey) {
        let reaction = &self.registry[key];
        if let Err(observed) = reaction.status_cell().retire() {
            panic!(
                "worker {worker}: reaction {} completed with status {observed:?}, expected {:?}",
                reaction.name(),
                ReactionStatus::Queued,
            );
        }
        tracing::trace!(worker = %worker, reaction = %reaction.name(), "Done with reaction");
    }

    /// Admit a reaction for execution at the current tag. Exactly one of
    /// any number of concurrent triggers wins; the rest are silent
    /// no-ops.
    pub fn trigger_reaction(&self, key: ReactionKey, worker: WorkerId) {
        let reaction = &self.registry[key];
        if !reaction.status_cell().admit() {
            // Another triggerer already admitted it at this tag.
            return;
        }
        let entry = QueueEntry {
            index: reaction.index(),
            key,
        };
        tracing::debug!(
            worker = %worker,
            reaction = %reaction.name(),
            level = %entry.index.level(),
            "Enqueueing reaction"
        );
        self.ready.insert(entry);
    }

    /// Request an orderly stop. Idempotent; every worker observes the
    /// flag on its next loop iteration.
    pub fn signal_stop(&self) {
        if self.should_stop.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("Stop signaled");
        self.semaphore.release(self.workers as usize - 1);
    }

    /// Runs on the last worker to go idle. Precondition: the executing
    /// queue is empty and every other worker is parked.
    fn try_advance_tag_and_distribute(&self) {
        loop {
            if self.ready.cursor() > self.ready.max_level() {
                self.ready.reset_cursor();
                let new_tag = {
                    let mut event_loop = self.event_loop.lock();
                    event_loop.advance_tag(&mut AdvanceCtx { sched: self })
                };
                match new_tag {
                    Some(tag) => {
                        self.clock.advance_to(tag);
                        tracing::debug!(tag = %tag, "Advanced to new tag");
                    }
                    None => {
                        self.signal_stop();
                        return;
                    }
                }
            }

            let ready = self.distribute_ready_reactions();
            if ready > 0 {
                self.notify_workers(ready);
                return;
            }
        }
    }

    /// Walk the levels from the cursor and point the workers at the
    /// first non-empty queue. Returns the number of ready reactions, or
    /// 0 when every remaining level is empty (the caller then advances
    /// the tag).
    fn distribute_ready_reactions(&self) -> usize {
        let max_level = self.ready.max_level();
        loop {
            let mut level = self.ready.cursor();
            if level > max_level {
                return 0;
            }

            {
                let mut event_loop = self.event_loop.lock();
                let floor = level;
                event_loop.try_advance_level(&mut level);
                // The hook may only skip forward.
                level = level.max(floor);
            }
            if level > max_level {
                self.ready.set_cursor(level);
                return 0;
            }

            let ready = self.ready.level_len(level);
            self.ready.set_cursor(level + 1);
            if ready > 0 {
                self.ready.set_executing(level);
                tracing::debug!(level = %level, ready, "Distributing level");
                return ready;
            }
            tracing::trace!(level = %level, "Level empty, skipping");
        }
    }

    /// Wake as many parked workers as there are ready reactions. The
    /// caller counts as one of the awakened workers and takes no
    /// semaphore permit.
    fn notify_workers(&self, ready: usize) {
        let idle = self.number_of_idle_workers.load(Ordering::Acquire);
        let to_wake = (ready.min(idle as usize)) as u32;
        self.number_of_idle_workers
            .fetch_sub(to_wake, Ordering::AcqRel);
        if to_wake > 1 {
            self.semaphore.release(to_wake as usize - 1);
        }
    }
}
