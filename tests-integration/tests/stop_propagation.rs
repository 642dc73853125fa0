//! After `signal_stop`, every worker returns STOP in bounded time.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use gyre::runtime::{AdvanceCtx, Config, EventLoop, Executor, ReactionRegistry, Scheduler, Tag};

/// Tag source that parks the advancing worker until the test releases it.
struct ParkedLoop {
    parked_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl EventLoop for ParkedLoop {
    fn advance_tag(&mut self, _ctx: &mut AdvanceCtx<'_>) -> Option<Tag> {
        let _ = self.parked_tx.send(());
        let _ = self.release_rx.recv_timeout(Duration::from_secs(10));
        None
    }
}

#[test_log::test]
fn signal_stop_wakes_all_workers() {
    let (parked_tx, parked_rx) = crossbeam_channel::unbounded();
    let (release_tx, release_rx) = crossbeam_channel::unbounded();

    let scheduler = Scheduler::new(
        Arc::new(ReactionRegistry::new()),
        Box::new(ParkedLoop {
            parked_tx,
            release_rx,
        }),
        &Config::default().with_workers(4),
    )
    .unwrap();

    let mut executor = Executor::new(scheduler.clone());
    executor.spawn().unwrap();

    // All four workers are idle: three parked on the semaphore, the
    // last-idle one inside the tag advance.
    parked_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("no worker reached the tag advance");

    scheduler.signal_stop();
    release_tx.send(()).unwrap();

    // Join returning proves every worker observed the stop flag.
    executor.join();
    assert!(scheduler.should_stop());
}
