// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use stratum_level::{CacheLevel, miss};
use stratum_result::{AsyncResult, CompletionContext, Error, Outcome, Promise, panic_message};

use crate::builder::DiskLevelBuilder;
use crate::queue::ConfinementQueue;
use crate::store::EntryStore;
use crate::{Codec, Fingerprint};

struct DiskInner<C> {
    queue: ConfinementQueue<EntryStore>,
    codec: Arc<C>,
    // Held while the change is queued, so the worker applies changes in the order they are stored.
    capacity: Mutex<u64>,
    completion: CompletionContext,
    root: PathBuf,
}

/// A cache level that stores one file per entry under a directory.
///
/// The level keeps the total size of its entry files at or below a byte capacity by deleting the
/// least recently used files, where recency is each file's modification time. Reads refresh the
/// modification time. All file-system work for one level runs on a dedicated worker thread, in
/// the order it was requested, so a lookup issued after a write always observes it.
///
/// Lookups deliver their outcome on the level's [`CompletionContext`]. By default that is a
/// delivery thread owned by the level, so callbacks never run on the worker and may block on
/// the level.
///
/// The handle is cheap to clone. The worker stops once the last clone is dropped, after finishing
/// the work already queued.
///
/// # Examples
///
/// ```
/// use stratum_disk::{DiskLevel, Utf8Codec};
/// use stratum_level::CacheLevel;
///
/// let dir = tempfile::tempdir()?;
/// let level = DiskLevel::<&str, String, _>::builder(dir.path(), Utf8Codec)
///     .capacity(1024 * 1024)
///     .build()?;
///
/// level.set("hello".to_string(), &"greeting");
/// let value = futures::executor::block_on(level.get(&"greeting"));
/// assert_eq!(value.into_value().as_deref(), Some("hello"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DiskLevel<K, V, C> {
    inner: Arc<DiskInner<C>>,
    _types: PhantomData<fn(&K) -> V>,
}

impl<K, V, C> DiskLevel<K, V, C> {
    /// Starts configuring a level stored under `path`, encoding values with `codec`.
    pub fn builder(path: impl Into<PathBuf>, codec: C) -> DiskLevelBuilder<K, V, C> {
        DiskLevelBuilder::new(path.into(), codec)
    }

    pub(crate) fn from_parts(
        queue: ConfinementQueue<EntryStore>,
        codec: C,
        capacity: u64,
        completion: CompletionContext,
        root: PathBuf,
    ) -> Self {
        Self {
            inner: Arc::new(DiskInner {
                queue,
                codec: Arc::new(codec),
                capacity: Mutex::new(capacity),
                completion,
                root,
            }),
            _types: PhantomData,
        }
    }

    /// Returns the directory holding the entries.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.root
    }

    /// Returns the capacity in bytes most recently requested.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        *self.inner.capacity.lock()
    }

    /// Changes the capacity and evicts entries until the level fits.
    ///
    /// The most recently used entry is kept even if it alone exceeds the new capacity.
    pub fn set_capacity(&self, bytes: u64) {
        let mut capacity = self.inner.capacity.lock();
        *capacity = bytes;
        self.inner.queue.submit(move |store| store.set_capacity(bytes));
    }

    /// Reports the total size of the entries once the work queued before this call has run.
    pub fn size(&self) -> AsyncResult<u64> {
        self.query(|store| store.size())
    }

    /// Resolves once all work queued before this call has run.
    ///
    /// Writes and clears are fire-and-forget; awaiting `drain` makes their effects observable.
    pub fn drain(&self) -> AsyncResult<()> {
        self.query(|_| ())
    }

    /// Removes the entry stored for `key`, if any.
    pub fn invalidate(&self, key: &K)
    where
        K: Display,
    {
        let fingerprint = Fingerprint::of(key);
        self.inner.queue.submit(move |store| {
            if store.discard(fingerprint) {
                tracing::debug!(cache.fingerprint = %fingerprint, "disk cache entry invalidated");
            }
        });
    }

    fn query<T>(&self, read: impl FnOnce(&mut EntryStore) -> T + Send + 'static) -> AsyncResult<T>
    where
        T: Send + Sync + 'static,
    {
        self.run(move |store| Outcome::Succeeded(read(store)))
    }

    /// Runs `task` on the worker and settles the returned result with its outcome.
    ///
    /// A panicking task settles the result as failed.
    fn run<T>(&self, task: impl FnOnce(&mut EntryStore) -> Outcome<T> + Send + 'static) -> AsyncResult<T>
    where
        T: Send + Sync + 'static,
    {
        let promise = Promise::with_context(self.inner.completion.clone());
        let result = promise.result();

        let submitted = self.inner.queue.submit(move |store| {
            let outcome = catch_unwind(AssertUnwindSafe(|| task(store))).unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref()).to_string();
                tracing::error!(panic = %message, "disk cache task panicked");
                Outcome::Failed(Error::from_message(format!("disk cache task panicked: {message}")))
            });
            let _settled = promise.settle(outcome);
        });

        if submitted {
            result
        } else {
            AsyncResult::failed(Error::from_message("disk cache worker has stopped"))
        }
    }
}

impl<K, V, C> Clone for DiskLevel<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _types: PhantomData,
        }
    }
}

impl<K, V, C> Debug for DiskLevel<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskLevel")
            .field("path", &self.inner.root)
            .field("capacity", &self.capacity())
            .field("completion", &self.inner.completion)
            .finish_non_exhaustive()
    }
}

impl<K, V, C> CacheLevel<K, V> for DiskLevel<K, V, C>
where
    K: Display,
    V: Send + Sync + 'static,
    C: Codec<V> + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<V> {
        let fingerprint = Fingerprint::of(key);
        let codec = Arc::clone(&self.inner.codec);
        self.run(move |store| lookup(store, codec.as_ref(), fingerprint))
    }

    fn set(&self, value: V, key: &K) {
        let fingerprint = Fingerprint::of(key);
        let codec = Arc::clone(&self.inner.codec);

        self.inner.queue.submit(move |store| {
            let bytes = match codec.encode(&value) {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::error!(cache.fingerprint = %fingerprint, %error, "failed to encode disk cache entry");
                    return;
                }
            };

            if let Err(error) = store.write(fingerprint, &bytes) {
                tracing::error!(
                    cache.fingerprint = %fingerprint,
                    cache.size = store.size(),
                    %error,
                    "failed to write disk cache entry"
                );
            }
        });
    }

    fn clear(&self) {
        self.inner.queue.submit(EntryStore::clear);
    }

    fn on_memory_warning(&self) {
        // Nothing is held in memory.
    }
}

fn lookup<V, C>(store: &mut EntryStore, codec: &C, fingerprint: Fingerprint) -> Outcome<V>
where
    C: Codec<V>,
{
    let Some(bytes) = store.load(fingerprint) else {
        tracing::debug!(cache.fingerprint = %fingerprint, "disk cache miss");
        return Outcome::Failed(miss());
    };

    match codec.decode(&bytes) {
        Ok(value) => {
            store.touch(fingerprint);
            tracing::debug!(cache.fingerprint = %fingerprint, cache.bytes = bytes.len(), "disk cache hit");
            Outcome::Succeeded(value)
        }
        Err(error) => {
            tracing::warn!(cache.fingerprint = %fingerprint, %error, "corrupt disk cache entry removed");
            store.discard(fingerprint);
            Outcome::Failed(miss())
        }
    }
}
