//! The Scheduler is the core of the runtime. It distributes ready
//! reactions to a fixed pool of worker threads, one precedence level at
//! a time, and drives logical time forward whenever every worker has
//! gone idle.

mod gedf;
mod queue;
mod ready;
mod semaphore;

pub use gedf::{AdvanceCtx, EventLoop, Scheduler};

/// Highest precedence level when neither the configuration nor the
/// registry says otherwise.
pub const DEFAULT_MAX_LEVEL: usize = 100;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads to dispatch reactions to.
    pub workers: usize,
    /// Reaction counts per level, used to size the per-level ready
    /// queues. Derived from the registry when absent.
    pub num_reactions_per_level: Option<Vec<usize>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 1,
            num_reactions_per_level: None,
        }
    }
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_num_reactions_per_level(mut self, counts: Vec<usize>) -> Self {
        self.num_reactions_per_level = Some(counts);
        self
    }
}

/// Scheduler errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchedError {
    #[error("scheduler requires at least one worker")]
    NoWorkers,

    #[error("worker pool already started")]
    AlreadyStarted,

    #[error("scheduler is shut down")]
    ShutDown,
}
