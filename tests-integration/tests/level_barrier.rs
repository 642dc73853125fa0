//! No reaction of level k+1 starts before every level-k reaction at the
//! same tag has completed.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;

use gyre::runtime::{Config, EventQueue, Executor, Level, ReactionRegistry, Scheduler, WorkerId};

#[test_log::test]
fn level_barrier_two_workers() {
    let level0_done = Arc::new(AtomicU32::new(0));
    let barrier_broken = Arc::new(AtomicBool::new(false));
    let r2_ran = Arc::new(AtomicBool::new(false));

    let mut registry = ReactionRegistry::new();
    let mut level0 = |name: &'static str| {
        let done = level0_done.clone();
        registry.register(name, Level(0), move |_ctx| {
            std::thread::sleep(Duration::from_millis(50));
            done.fetch_add(1, Ordering::AcqRel);
        })
    };
    let r1 = level0("R1");
    let r3 = level0("R3");

    let r2 = {
        let done = level0_done.clone();
        let broken = barrier_broken.clone();
        let ran = r2_ran.clone();
        registry.register("R2", Level(1), move |_ctx| {
            if done.load(Ordering::Acquire) != 2 {
                broken.store(true, Ordering::Release);
            }
            ran.store(true, Ordering::Release);
        })
    };

    let scheduler = Scheduler::new(
        Arc::new(registry),
        Box::new(EventQueue::new()),
        &Config::default().with_workers(2),
    )
    .unwrap();

    for key in [r1, r2, r3] {
        scheduler.trigger_reaction(key, WorkerId::ANONYMOUS);
    }

    Executor::new(scheduler).run().unwrap();

    assert_eq!(level0_done.load(Ordering::Acquire), 2);
    assert!(r2_ran.load(Ordering::Acquire), "level-1 reaction never ran");
    assert!(
        !barrier_broken.load(Ordering::Acquire),
        "level-1 reaction started before level 0 drained"
    );
}
