//! Cross-tag ordering: every reaction at tag T completes before any
//! reaction at T+1 is dispatched, and a reaction may fire again at each
//! new tag.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use gyre::runtime::{
    Config, EventQueue, Executor, Level, ReactionRegistry, Scheduler, Tag,
};

#[test_log::test]
fn tags_execute_in_order() {
    let log: Arc<Mutex<Vec<(Tag, &str)>>> = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ReactionRegistry::new();

    // L_max = 0: the tag advances after each drain.
    let mut reaction = |name: &'static str| {
        let log = log.clone();
        registry.register(name, Level(0), move |ctx| {
            log.lock().unwrap().push((ctx.tag(), name))
        })
    };
    let a = reaction("A");
    let b = reaction("B");

    let t0 = Tag::new(Duration::ZERO, 0);
    let t0_1 = t0.delay(None);
    let t1 = Tag::new(Duration::from_secs(1), 0);

    let mut events = EventQueue::new();
    // Scheduled out of order; the queue orders them by tag.
    events.schedule(t1, [a]);
    events.schedule(t0, [b]);
    events.schedule(t0_1, [a, b]);

    let scheduler = Scheduler::new(
        Arc::new(registry),
        Box::new(events),
        &Config::default().with_workers(2),
    )
    .unwrap();
    Executor::new(scheduler).run().unwrap();

    let log = log.lock().unwrap();
    let tags: Vec<_> = log.iter().map(|(tag, _)| *tag).collect();
    let mut sorted = tags.clone();
    sorted.sort();
    assert_eq!(tags, sorted, "tags must be non-decreasing: {log:?}");

    assert_eq!(log[0], (t0, "B"));
    assert_eq!(log.last(), Some(&(t1, "A")));
    // A and B both fired at the microstep tag, in some order.
    assert_eq!(log.len(), 4);
    assert!(log[1..3].iter().all(|(tag, _)| *tag == t0_1));
}

#[test_log::test]
fn shutdown_tag_cuts_off_later_events() {
    let log: Arc<Mutex<Vec<&str>>> = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ReactionRegistry::new();
    let mut reaction = |name: &'static str| {
        let log = log.clone();
        registry.register(name, Level(0), move |_ctx| {
            log.lock().unwrap().push(name)
        })
    };
    let early = reaction("early");
    let late = reaction("late");

    let mut events = EventQueue::new();
    events.schedule(Tag::new(Duration::ZERO, 0), [early]);
    events.schedule(Tag::new(Duration::from_secs(2), 0), [late]);
    events.schedule_shutdown(Tag::new(Duration::from_secs(1), 0));

    let scheduler = Scheduler::new(
        Arc::new(registry),
        Box::new(events),
        &Config::default().with_workers(1),
    )
    .unwrap();
    Executor::new(scheduler).run().unwrap();

    assert_eq!(log.lock().unwrap().as_slice(), &["early"]);
}
