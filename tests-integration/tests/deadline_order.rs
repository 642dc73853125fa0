//! Reactions within a level are dispatched in ascending index order.

use std::sync::{Arc, Mutex};

use gyre::runtime::{
    Config, EventQueue, Executor, Level, ReactionIndex, ReactionRegistry, Scheduler, WorkerId,
};

#[test_log::test]
fn deadline_order_single_worker() {
    let log: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ReactionRegistry::new();

    let mut reaction = |name: &'static str, tiebreaker: u64| {
        let log = log.clone();
        registry.register_at(
            name,
            ReactionIndex::new(Level(0), tiebreaker),
            move |_ctx| log.lock().unwrap().push(name),
        )
    };
    let a = reaction("A", 3);
    let b = reaction("B", 1);
    let c = reaction("C", 2);

    let scheduler = Scheduler::new(
        Arc::new(registry),
        Box::new(EventQueue::new()),
        &Config::default().with_workers(1),
    )
    .unwrap();

    // Triggered in the order A, B, C; dispatched by deadline.
    for key in [a, b, c] {
        scheduler.trigger_reaction(key, WorkerId::ANONYMOUS);
    }

    Executor::new(scheduler).run().unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), &["B", "C", "A"]);
}
