//! One-shot readiness signal
//!
//! A single slot that moves from pending to published exactly once. Waiters that
//! arrive early park until the value lands; waiters that arrive late read it
//! straight away. The published value is never replaced.

use crate::error::ProtocolMisuse;
use once_cell::sync::OnceCell;
use std::fmt;

pub struct ReadinessGate<T> {
    slot: OnceCell<T>,
}

impl<T> ReadinessGate<T> {
    pub const fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// Publish the value and wake every waiter.
    ///
    /// A second publish is rejected and the first value stays in place.
    pub fn publish(&self, value: T) -> Result<(), ProtocolMisuse> {
        self.slot
            .set(value)
            .map_err(|_| ProtocolMisuse::PublishedTwice)
    }

    /// Block until published, then borrow the value.
    pub fn wait(&self) -> &T {
        self.slot.wait()
    }

    /// Non-blocking peek.
    pub fn try_get(&self) -> Option<&T> {
        self.slot.get()
    }

    pub fn is_published(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T> Default for ReadinessGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadinessGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(value) => f.debug_tuple("Published").field(value).finish(),
            None => f.write_str("Pending"),
        }
    }
}
