//! Runtime keys for the scheduler's components.

slotmap::new_key_type! {
    /// Runtime key for a Reaction in the registry arena.
    pub struct ReactionKey;
}

/// Identity of a worker thread within the scheduler's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Trigger origin for callers outside the worker pool.
    pub const ANONYMOUS: Self = Self(usize::MAX);
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if *self == Self::ANONYMOUS {
            write!(f, "W?")
        } else {
            write!(f, "W{}", self.0)
        }
    }
}
