//! Gyre is a deterministic, level-synchronized reaction scheduler for
//! the "Reactors" model: reactions are registered with a precedence
//! level, and a fixed pool of workers executes them one level at a time,
//! in earliest-deadline-first order within each level, firing each
//! reaction at most once per logical-time tag.
//!
//! ## Example
//!
//! Register a three-level pipeline and run it to completion on two
//! workers:
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//!
//! use gyre::runtime::{Config, EventQueue, Executor, Level, ReactionRegistry, Scheduler, Tag};
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let mut registry = ReactionRegistry::new();
//! let keys: Vec<_> = ["sense", "plan", "act"]
//!     .into_iter()
//!     .enumerate()
//!     .map(|(level, name)| {
//!         let log = log.clone();
//!         registry.register(name, Level(level), move |_ctx| {
//!             log.lock().unwrap().push(name);
//!         })
//!     })
//!     .collect();
//!
//! let mut events = EventQueue::new();
//! events.schedule(Tag::ZERO, keys.iter().copied());
//!
//! let scheduler = Scheduler::new(
//!     Arc::new(registry),
//!     Box::new(events),
//!     &Config::default().with_workers(2),
//! )
//! .unwrap();
//!
//! Executor::new(scheduler).run().unwrap();
//!
//! assert_eq!(log.lock().unwrap().as_slice(), &["sense", "plan", "act"]);
//! ```

// Re-exports
pub use gyre_core as core;
pub use gyre_runtime as runtime;
