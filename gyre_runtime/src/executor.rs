use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use crate::{ReactionCtx, SchedError, Scheduler, WorkerId};

/// Owns the worker pool driving a [`Scheduler`].
///
/// Workers loop popping ready reactions, executing their bodies, and
/// retiring them, until the scheduler signals stop.
pub struct Executor {
    scheduler: Arc<Scheduler>,
    handles: Vec<JoinHandle<()>>,
    started: AtomicBool,
}

impl Executor {
    pub fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            handles: Vec::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Spawn the worker pool. A second call is a no-op that reports
    /// [`SchedError::AlreadyStarted`].
    #[tracing::instrument(skip(self))]
    pub fn spawn(&mut self) -> Result<(), SchedError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SchedError::AlreadyStarted);
        }
        tracing::info!(workers = self.scheduler.workers(), "Starting the execution");
        for i in 0..self.scheduler.workers() {
            let scheduler = self.scheduler.clone();
            let handle = std::thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || worker_loop(scheduler, WorkerId(i)))
                .expect("failed to spawn worker thread");
            self.handles.push(handle);
        }
        Ok(())
    }

    /// Block until every worker has observed stop and returned.
    pub fn join(&mut self) {
        for handle in self.handles.drain(..) {
            handle.join().expect("worker thread panicked");
        }
    }

    /// Spawn the workers and block until the run completes.
    pub fn run(&mut self) -> Result<(), SchedError> {
        self.spawn()?;
        self.join();
        Ok(())
    }

    /// Request an orderly stop of the run.
    pub fn shutdown(&self) {
        self.scheduler.signal_stop();
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.scheduler.signal_stop();
            self.join();
        }
    }
}

fn worker_loop(scheduler: Arc<Scheduler>, worker: WorkerId) {
    tracing::debug!(worker = %worker, "Worker started");
    while let Some(key) = scheduler.get_ready_reaction(worker) {
        let reaction = &scheduler.registry()[key];
        let ctx = ReactionCtx {
            scheduler: &scheduler,
            worker,
            tag: scheduler.current_tag(),
        };
        tracing::trace!(worker = %worker, reaction = %reaction.name(), tag = %ctx.tag, "Executing");
        reaction.execute(&ctx);
        scheduler.done_with_reaction(worker, key);
    }
    tracing::debug!(worker = %worker, "Worker stopped");
}
