// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock cache level for testing.
//!
//! This module provides `MockLevel`, an in-memory level that records every operation and
//! supports failure injection for testing miss and error paths.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;
use stratum_result::{AsyncResult, Error};

use crate::{CacheLevel, miss};

/// Recorded level operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelOp<K, V> {
    /// A lookup was performed with the given key.
    Get(K),
    /// A write was performed.
    Set {
        /// The key that was written.
        key: K,
        /// The value that was written.
        value: V,
    },
    /// The level was cleared.
    Clear,
    /// The level received a memory warning.
    MemoryWarning,
}

type FailPredicate<K, V> = Box<dyn Fn(&LevelOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock cache level for testing.
///
/// Lookups settle before `get` returns: with the stored value, with a
/// [`miss`](crate::miss) error, or with an injected failure. A memory warning drops every
/// entry, the way a memory-resident level would.
///
/// # Examples
///
/// ```
/// use stratum_level::CacheLevel;
/// use stratum_level::testing::{LevelOp, MockLevel};
///
/// let level = MockLevel::<String, i32>::new();
/// level.set(42, &"key".to_string());
///
/// let outcome = level.get(&"key".to_string()).outcome().unwrap();
/// assert_eq!(outcome.into_value(), Some(42));
///
/// assert_eq!(
///     level.operations(),
///     vec![
///         LevelOp::Set { key: "key".to_string(), value: 42 },
///         LevelOp::Get("key".to_string()),
///     ]
/// );
/// ```
///
/// # Failure Injection
///
/// ```
/// use stratum_level::CacheLevel;
/// use stratum_level::testing::{LevelOp, MockLevel};
///
/// let level = MockLevel::<String, i32>::new();
/// level.set(1, &"forbidden".to_string());
/// level.fail_when(|op| matches!(op, LevelOp::Get(k) if k == "forbidden"));
///
/// let outcome = level.get(&"forbidden".to_string()).outcome().unwrap();
/// assert!(outcome.is_failed());
/// ```
pub struct MockLevel<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<LevelOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockLevel<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLevel")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockLevel<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockLevel<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockLevel<K, V> {
    /// Creates a new empty mock level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }
}

impl<K, V> MockLevel<K, V>
where
    K: Eq + Hash,
{
    /// Creates a mock level with pre-populated data.
    #[must_use]
    pub fn with_data(data: HashMap<K, V>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of entries in the level.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the level holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockLevel<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines which operations fail.
    ///
    /// A failing lookup settles as failed even if the key is stored. A failing write or clear
    /// is recorded but leaves the data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&LevelOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<LevelOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Records `op` and reports whether it should fail.
    fn record(&self, op: LevelOp<K, V>) -> bool {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        fail
    }
}

impl<K, V> CacheLevel<K, V> for MockLevel<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<V> {
        if self.record(LevelOp::Get(key.clone())) {
            return AsyncResult::failed(Error::from_message("mock: get failed"));
        }
        match self.data.lock().get(key) {
            Some(value) => AsyncResult::succeeded(value.clone()),
            None => AsyncResult::failed(miss()),
        }
    }

    fn set(&self, value: V, key: &K) {
        let failed = self.record(LevelOp::Set {
            key: key.clone(),
            value: value.clone(),
        });
        if !failed {
            self.data.lock().insert(key.clone(), value);
        }
    }

    fn clear(&self) {
        if !self.record(LevelOp::Clear) {
            self.data.lock().clear();
        }
    }

    fn on_memory_warning(&self) {
        if !self.record(LevelOp::MemoryWarning) {
            self.data.lock().clear();
        }
    }
}
