use std::collections::BinaryHeap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::{Receiver, Sender};

use crate::{AdvanceCtx, EventLoop, ReactionKey, SchedError, Tag};

/// A set of reactions to admit at a tag.
#[derive(Debug, Clone)]
pub struct TagEvent {
    pub(crate) tag: Tag,
    pub(crate) reactions: Vec<ReactionKey>,
    /// Whether the scheduler should terminate after reaching this event.
    pub(crate) terminal: bool,
}

impl TagEvent {
    pub fn new(tag: Tag, reactions: impl IntoIterator<Item = ReactionKey>) -> Self {
        Self {
            tag,
            reactions: reactions.into_iter().collect(),
            terminal: false,
        }
    }

    /// Create a shutdown event.
    pub fn shutdown(tag: Tag) -> Self {
        Self {
            tag,
            reactions: Vec::new(),
            terminal: true,
        }
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }
}

impl std::fmt::Display for TagEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[tag={},({}R),terminal={}]",
            self.tag,
            self.reactions.len(),
            self.terminal
        )
    }
}

impl Eq for TagEvent {}

impl PartialEq for TagEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.terminal == other.terminal
    }
}

impl PartialOrd for TagEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tag
            .cmp(&other.tag)
            .then(self.terminal.cmp(&other.terminal))
            .reverse()
    }
}

/// The default tag source: a tag-ordered event queue with a channel for
/// asynchronous injection from outside the worker pool.
///
/// Each `advance_tag` drains the channel into the queue, pops the
/// earliest event, and admits its reactions. The run stops at a terminal
/// event, at the programmed shutdown tag, or when the queue runs dry.
pub struct EventQueue {
    /// The main event queue, sorted by tag
    event_queue: BinaryHeap<TagEvent>,
    event_tx: Sender<TagEvent>,
    event_rx: Receiver<TagEvent>,
    /// A shutdown has been scheduled at this tag.
    shutdown_tag: Option<Tag>,
    /// Set once the queue has handed the scheduler its final tag; shared
    /// with every injection handle so late sends are refused instead of
    /// piling up unread.
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("event_queue", &self.event_queue)
            .field("shutdown_tag", &self.shutdown_tag)
            .finish_non_exhaustive()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        Self {
            event_queue: BinaryHeap::new(),
            event_tx,
            event_rx,
            shutdown_tag: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Refuse all further injections. Idempotent.
    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Seed an event before or during a run.
    pub fn schedule(&mut self, tag: Tag, reactions: impl IntoIterator<Item = ReactionKey>) {
        self.event_queue.push(TagEvent::new(tag, reactions));
    }

    /// Stop the run once logical time reaches `tag`.
    pub fn schedule_shutdown(&mut self, tag: Tag) {
        self.shutdown_tag = Some(tag);
    }

    /// Handle for injecting events from other threads.
    pub fn async_sender(&self) -> AsyncSender {
        AsyncSender {
            tx: self.event_tx.clone(),
            closed: self.closed.clone(),
        }
    }
}

impl Drop for EventQueue {
    fn drop(&mut self) {
        self.close();
    }
}

impl EventLoop for EventQueue {
    #[tracing::instrument(level = "debug", skip(self, ctx))]
    fn advance_tag(&mut self, ctx: &mut AdvanceCtx<'_>) -> Option<Tag> {
        // Push pending async events into the queue
        for event in self.event_rx.try_iter() {
            self.event_queue.push(event);
        }

        let Some(event) = self.event_queue.pop() else {
            tracing::trace!("No more events in queue. -> Terminate!");
            self.close();
            return None;
        };

        let past_shutdown = self
            .shutdown_tag
            .map(|shutdown_tag| event.tag >= shutdown_tag)
            .unwrap_or(false);
        if event.terminal || past_shutdown {
            tracing::debug!(event = %event, "Reached stop tag");
            self.close();
            return None;
        }

        tracing::debug!(event = %event, "Handling event");
        for key in event.reactions {
            ctx.trigger(key);
        }
        Some(event.tag)
    }
}

/// Clonable handle for injecting events into an [`EventQueue`] from
/// outside the worker pool.
#[derive(Debug, Clone)]
pub struct AsyncSender {
    tx: Sender<TagEvent>,
    closed: Arc<AtomicBool>,
}

impl AsyncSender {
    pub fn send(&self, event: TagEvent) -> Result<(), SchedError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SchedError::ShutDown);
        }
        self.tx.send(event).map_err(|_| SchedError::ShutDown)
    }
}
