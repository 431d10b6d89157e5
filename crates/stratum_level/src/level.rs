// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The contract every cache level implements.
//!
//! [`CacheLevel`] is the seam between concrete levels (memory, disk, network) and the operators
//! that compose them. A composed pipeline is itself a `CacheLevel`, so callers never see a
//! difference between one level and many.

use std::sync::Arc;

use stratum_result::AsyncResult;

/// A tier of a cache that resolves keys to values.
///
/// Every method returns without waiting for the underlying storage. Lookups report their outcome
/// through the returned [`AsyncResult`]; writes and clears are fire-and-forget, and an
/// implementation logs their failures instead of surfacing them. Implementations never panic to
/// signal a miss.
///
/// The trait is dyn-compatible; see [`DynamicLevel`](crate::DynamicLevel) for a clonable,
/// type-erased handle.
pub trait CacheLevel<K, V>: Send + Sync {
    /// Looks up the value stored for `key`.
    ///
    /// The result fails if the level does not hold the key.
    fn get(&self, key: &K) -> AsyncResult<V>;

    /// Stores `value` under `key`.
    fn set(&self, value: V, key: &K);

    /// Invalidates every entry.
    ///
    /// Lookups already in flight are not cancelled; lookups issued afterwards see a clean level.
    fn clear(&self);

    /// Reacts to memory pressure reported by the host.
    ///
    /// Levels holding entries in memory evict eagerly. Levels without memory-resident state treat
    /// this as a no-op.
    fn on_memory_warning(&self);
}

impl<K, V, T> CacheLevel<K, V> for Arc<T>
where
    T: CacheLevel<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> AsyncResult<V> {
        (**self).get(key)
    }

    fn set(&self, value: V, key: &K) {
        (**self).set(value, key);
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn on_memory_warning(&self) {
        (**self).on_memory_warning();
    }
}
