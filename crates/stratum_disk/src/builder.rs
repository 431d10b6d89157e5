// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring disk levels.

use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::path::PathBuf;

use stratum_result::CompletionContext;
use tick::Clock;

use crate::queue::{ConfinementQueue, delivery_context};
use crate::store::EntryStore;
use crate::{DEFAULT_CAPACITY, DiskLevel, OpenError};

const DEFAULT_THREAD_NAME: &str = "stratum-disk";

/// Builder for configuring a [`DiskLevel`].
///
/// Create one with [`DiskLevel::builder`].
///
/// # Examples
///
/// ```
/// use stratum_disk::{DiskLevel, RawCodec};
/// use stratum_result::CompletionContext;
///
/// let dir = tempfile::tempdir()?;
/// let level = DiskLevel::<u64, Vec<u8>, _>::builder(dir.path().join("blobs"), RawCodec)
///     .capacity(64 * 1024 * 1024)
///     .completion(CompletionContext::inline())
///     .thread_name("blob-cache")
///     .build()?;
///
/// assert_eq!(level.capacity(), 64 * 1024 * 1024);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct DiskLevelBuilder<K, V, C> {
    path: PathBuf,
    codec: C,
    capacity: u64,
    clock: Option<Clock>,
    completion: Option<CompletionContext>,
    thread_name: Option<String>,
    _types: PhantomData<fn(&K) -> V>,
}

impl<K, V, C> DiskLevelBuilder<K, V, C> {
    pub(crate) fn new(path: PathBuf, codec: C) -> Self {
        Self {
            path,
            codec,
            capacity: DEFAULT_CAPACITY,
            clock: None,
            completion: None,
            thread_name: None,
            _types: PhantomData,
        }
    }

    /// Sets the maximum total size of the entries, in bytes.
    ///
    /// Defaults to 100 MiB.
    #[must_use]
    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Sets the clock used to stamp entries with their last use.
    ///
    /// Without a clock, entries are stamped with the system time.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets where callbacks of lookup results run.
    ///
    /// By default the level starts a second thread, named after the worker with a `-delivery`
    /// suffix, that runs callbacks and nothing else. Callbacks never run on the worker, so they
    /// may block on the level. [`CompletionContext::inline`] runs them on the worker instead; such
    /// callbacks must not block on the level.
    #[must_use]
    pub fn completion(mut self, context: CompletionContext) -> Self {
        self.completion = Some(context);
        self
    }

    /// Names the worker thread.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = Some(name.into());
        self
    }

    /// Creates the directory if needed, scans the entries already in it, and starts the worker.
    ///
    /// Leftover temporary files from an interrupted write are removed. If the entries already
    /// stored exceed the capacity, the least recently used ones are evicted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or a thread cannot be spawned.
    pub fn build(self) -> Result<DiskLevel<K, V, C>, OpenError> {
        let store = EntryStore::open(self.path.clone(), self.capacity, self.clock)?;
        let name = self.thread_name.unwrap_or_else(|| DEFAULT_THREAD_NAME.to_string());
        let completion = match self.completion {
            Some(context) => context,
            None => delivery_context(format!("{name}-delivery"))
                .map_err(|error| OpenError::caused_by(self.path.display().to_string(), error))?,
        };
        let queue = ConfinementQueue::start(name, store)
            .map_err(|error| OpenError::caused_by(self.path.display().to_string(), error))?;

        Ok(DiskLevel::from_parts(
            queue,
            self.codec,
            self.capacity,
            completion,
            self.path,
        ))
    }
}

impl<K, V, C> Debug for DiskLevelBuilder<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskLevelBuilder")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("completion", &self.completion)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}
