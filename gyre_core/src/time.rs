use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An instant on the runtime's physical timeline, counted in whole
/// nanoseconds since the UNIX epoch.
///
/// The scheduler only ever compares instants and shifts them forward, so
/// the representation is a bare tick count. Saturating arithmetic keeps
/// every deadline computation total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// The UNIX epoch itself.
    pub const ORIGIN: Self = Self { nanos: 0 };
    /// Later than any deadline the runtime will ever compute.
    pub const DISTANT_FUTURE: Self = Self { nanos: u64::MAX };

    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX epoch");
        Self::from_nanos(since_epoch.as_nanos() as u64)
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub const fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// This instant shifted `amount` into the future, saturating at
    /// [`Timestamp::DISTANT_FUTURE`].
    pub fn forward(&self, amount: Duration) -> Self {
        let ticks = u64::try_from(amount.as_nanos()).unwrap_or(u64::MAX);
        Self {
            nanos: self.nanos.saturating_add(ticks),
        }
    }

    /// Time left from `self` until `deadline`, or `None` once the
    /// deadline has passed.
    pub fn remaining_until(&self, deadline: Self) -> Option<Duration> {
        deadline
            .nanos
            .checked_sub(self.nanos)
            .map(Duration::from_nanos)
    }

    /// Span since `earlier`; zero if `earlier` is in the future.
    pub fn elapsed_since(&self, earlier: Self) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }
}

/// A logical-time instant plus a microstep counter, the unit of
/// deterministic execution.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub struct Tag {
    /// Offset from the start of logical time
    offset: Duration,
    /// Superdense-timestep
    micro_step: usize,
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {})", self.offset, self.micro_step)
    }
}

impl Tag {
    pub const ZERO: Self = Self {
        offset: Duration::ZERO,
        micro_step: 0,
    };

    pub const FOREVER: Self = Self {
        offset: Duration::MAX,
        micro_step: usize::MAX,
    };

    /// Create a new Tag given an offset from the start of logical time,
    /// and a microstep
    pub fn new(offset: Duration, micro_step: usize) -> Tag {
        Self { offset, micro_step }
    }

    /// Create a new Tag offset from the current. A zero or absent offset
    /// advances the microstep instead.
    pub fn delay(&self, offset: impl Into<Option<Duration>>) -> Self {
        match offset.into() {
            Some(offset) if !offset.is_zero() => Self {
                offset: self.offset.saturating_add(offset),
                micro_step: 0,
            },
            _ => Self {
                offset: self.offset,
                micro_step: self.micro_step + 1,
            },
        }
    }

    /// The instant this tag names, given the start of logical time.
    pub fn to_logical_time(&self, origin: Timestamp) -> Timestamp {
        origin.forward(self.offset)
    }

    pub fn get_offset(&self) -> Duration {
        self.offset
    }

    pub fn get_micro_step(&self) -> usize {
        self.micro_step
    }
}
