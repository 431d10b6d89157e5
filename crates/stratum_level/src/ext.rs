// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use stratum_result::{AsyncResult, Outcome, Promise, merge_all};

use crate::{CacheLevel, Deferred, DynamicLevel, Fallback};

/// Operations available on every [`CacheLevel`].
///
/// The trait is implemented for all levels; import it to use the methods.
///
/// # Examples
///
/// ```
/// use stratum_level::{CacheLevel, CacheLevelExt, DynamicLevel};
///
/// fn erase<T>(level: T) -> DynamicLevel<String, i32>
/// where
///     T: CacheLevel<String, i32> + 'static,
/// {
///     level.into_dynamic()
/// }
/// ```
pub trait CacheLevelExt<K, V>: CacheLevel<K, V> + Sized {
    /// Looks up every key and joins the lookups.
    ///
    /// The values come back in the order of `keys`. The joined result fails with the first
    /// lookup that fails; see [`merge_all`].
    fn get_all(&self, keys: &[K]) -> AsyncResult<Vec<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        merge_all(keys.iter().map(|key| self.get(key)))
    }

    /// Composes this level with `secondary`, which is queried when this level misses.
    fn fallback<S>(self, secondary: S) -> Fallback<K, V, Self, S>
    where
        S: CacheLevel<K, V>,
    {
        Fallback::new(self, secondary)
    }

    /// Looks up `key`, producing and storing the value on a miss.
    ///
    /// The producer inside `value` runs at most once, and only when the lookup fails. A
    /// cancelled lookup stays cancelled and the producer never runs.
    fn get_or_set(&self, key: &K, value: Deferred<V>) -> AsyncResult<V>
    where
        Self: Clone + 'static,
        K: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let promise = Promise::new();
        let result = promise.result();
        let level = self.clone();
        let key = key.clone();

        self.get(&key).on_completion(move |outcome| match outcome {
            Outcome::Failed(_) => {
                let value = value.into_value();
                level.set(value.clone(), &key);
                let _settled = promise.resolve(value);
            }
            settled => {
                let _settled = promise.settle(settled.clone());
            }
        });

        result
    }

    /// Converts this level into a type-erased [`DynamicLevel`].
    fn into_dynamic(self) -> DynamicLevel<K, V>
    where
        Self: 'static,
    {
        DynamicLevel::new(self)
    }
}

impl<K, V, T> CacheLevelExt<K, V> for T where T: CacheLevel<K, V> {}
