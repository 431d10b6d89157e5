// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic cache level wrapper for type erasure.

use std::{fmt::Debug, sync::Arc};

use stratum_result::AsyncResult;

use crate::CacheLevel;

/// A clonable cache level with type erasure.
///
/// `DynamicLevel` wraps a trait object in an `Arc` so heterogeneous levels (memory, disk,
/// network, composed) can sit behind one type. Build one with
/// [`CacheLevelExt::into_dynamic`](crate::CacheLevelExt::into_dynamic).
pub struct DynamicLevel<K, V>(Arc<dyn CacheLevel<K, V>>);

impl<K, V> DynamicLevel<K, V> {
    /// Creates a dynamic level from any `CacheLevel` implementation.
    pub(crate) fn new<T>(level: T) -> Self
    where
        T: CacheLevel<K, V> + 'static,
    {
        Self(Arc::new(level))
    }
}

impl<K, V> Debug for DynamicLevel<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicLevel").finish_non_exhaustive()
    }
}

impl<K, V> Clone for DynamicLevel<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> CacheLevel<K, V> for DynamicLevel<K, V> {
    fn get(&self, key: &K) -> AsyncResult<V> {
        self.0.get(key)
    }

    fn set(&self, value: V, key: &K) {
        self.0.set(value, key);
    }

    fn clear(&self) {
        self.0.clear();
    }

    fn on_memory_warning(&self) {
        self.0.on_memory_warning();
    }
}
