// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

type Producer<V> = Box<dyn FnOnce() -> V + Send>;

enum Slot<V> {
    Pending(Producer<V>),
    Ready(V),
}

/// A value produced on first use.
///
/// `Deferred` owns a zero-argument producer. The producer runs at most once, the first time the
/// value is needed, and the result is kept for later uses. Operations that might not need the
/// value (a write that only happens on a miss, for example) take a `Deferred` by value so the
/// work is skipped entirely when it is not needed.
///
/// # Examples
///
/// ```
/// use stratum_level::Deferred;
///
/// let value = Deferred::new(|| "expensive".repeat(2));
/// assert!(value.get().is_none());
///
/// let value = value.force();
/// assert_eq!(value.get().map(String::as_str), Some("expensiveexpensive"));
/// assert_eq!(value.into_value(), "expensiveexpensive");
/// ```
pub struct Deferred<V> {
    slot: Slot<V>,
}

impl<V> Deferred<V> {
    /// Wraps `producer` without running it.
    pub fn new(producer: impl FnOnce() -> V + Send + 'static) -> Self {
        Self {
            slot: Slot::Pending(Box::new(producer)),
        }
    }

    /// Wraps a value that is already available.
    pub fn ready(value: V) -> Self {
        Self {
            slot: Slot::Ready(value),
        }
    }

    /// Returns `true` once the producer has run, or if the value was ready from the start.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }

    /// Returns the value if it has been produced.
    #[must_use]
    pub fn get(&self) -> Option<&V> {
        match &self.slot {
            Slot::Ready(value) => Some(value),
            Slot::Pending(_) => None,
        }
    }

    /// Runs the producer if it has not run yet. Forcing a ready value does nothing.
    #[must_use]
    pub fn force(self) -> Self {
        match self.slot {
            Slot::Pending(producer) => Self::ready(producer()),
            ready @ Slot::Ready(_) => Self { slot: ready },
        }
    }

    /// Consumes the wrapper and returns the value, running the producer if needed.
    pub fn into_value(self) -> V {
        match self.slot {
            Slot::Ready(value) => value,
            Slot::Pending(producer) => producer(),
        }
    }
}

impl<V> Debug for Deferred<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").field("ready", &self.is_ready()).finish()
    }
}
