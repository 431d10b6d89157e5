// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The file-system side of a disk level.
//!
//! An [`EntryStore`] owns one directory. Each entry is a file named after its [`Fingerprint`];
//! the file's modification time is its recency. The store keeps the total size of its entries
//! and evicts the least recently used ones once the size exceeds the capacity. It is not
//! thread-safe and lives on the worker thread of a
//! [`ConfinementQueue`](crate::queue::ConfinementQueue).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tick::Clock;

use crate::{Fingerprint, OpenError};

const TEMP_SUFFIX: &str = ".tmp";

/// A cached file as seen by a directory scan, ordered oldest first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ScannedEntry {
    modified: SystemTime,
    name: String,
    len: u64,
}

#[derive(Debug)]
pub(crate) struct EntryStore {
    root: PathBuf,
    size: u64,
    capacity: u64,
    clock: Option<Clock>,
    #[cfg(test)]
    refused: std::collections::HashSet<String>,
}

impl EntryStore {
    /// Opens `root`, creating it if needed, and computes the size of the entries already there.
    pub(crate) fn open(root: PathBuf, capacity: u64, clock: Option<Clock>) -> Result<Self, OpenError> {
        fs::create_dir_all(&root).map_err(|error| OpenError::caused_by(root.display().to_string(), error))?;

        let mut store = Self {
            root,
            size: 0,
            capacity,
            clock,
            #[cfg(test)]
            refused: std::collections::HashSet::new(),
        };
        store.remove_temp_files();
        store.size = store.scan_size();
        store.enforce_capacity(None);

        tracing::debug!(
            cache.size = store.size,
            cache.capacity = store.capacity,
            path = %store.root.display(),
            "disk cache opened"
        );
        Ok(store)
    }

    pub(crate) fn size(&self) -> u64 {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Reads the payload of an entry.
    ///
    /// An entry that exists but cannot be read is discarded and reported as absent.
    pub(crate) fn load(&mut self, fingerprint: Fingerprint) -> Option<Vec<u8>> {
        match fs::read(self.entry_path(fingerprint)) {
            Ok(bytes) => Some(bytes),
            Err(error) if error.kind() == io::ErrorKind::NotFound => None,
            Err(error) => {
                tracing::warn!(cache.fingerprint = %fingerprint, %error, "unreadable disk cache entry");
                self.discard(fingerprint);
                None
            }
        }
    }

    /// Marks an entry as the most recently used.
    pub(crate) fn touch(&self, fingerprint: Fingerprint) {
        let now = self.now();
        let touched = File::options()
            .write(true)
            .open(self.entry_path(fingerprint))
            .and_then(|file| file.set_modified(now));

        if let Err(error) = touched {
            tracing::warn!(cache.fingerprint = %fingerprint, %error, "failed to refresh disk cache entry");
        }
    }

    /// Removes an entry. Returns `true` if a file was removed.
    pub(crate) fn discard(&mut self, fingerprint: Fingerprint) -> bool {
        let path = self.entry_path(fingerprint);
        let Ok(metadata) = fs::metadata(&path) else {
            return false;
        };

        match self.remove(&fingerprint.to_string()) {
            Ok(()) => {
                self.size = self.size.saturating_sub(metadata.len());
                true
            }
            Err(error) => {
                tracing::warn!(cache.fingerprint = %fingerprint, %error, "failed to remove disk cache entry");
                false
            }
        }
    }

    /// Stores `bytes` as the payload of an entry, then evicts down to the capacity.
    ///
    /// The payload is written to a hidden file and renamed over the entry, so readers never see
    /// a partial payload. On failure the previous payload and the size are left unchanged.
    ///
    /// The size moves by the signed difference between the new and the previous payload: an
    /// overwrite with a shorter payload lowers it. The size is not grow-only, so it keeps
    /// matching the bytes on disk instead of drifting above them.
    pub(crate) fn write(&mut self, fingerprint: Fingerprint, bytes: &[u8]) -> io::Result<()> {
        let path = self.entry_path(fingerprint);
        let previous = fs::metadata(&path).map_or(0, |metadata| metadata.len());
        let temp = self.root.join(format!(".{fingerprint}{TEMP_SUFFIX}"));

        if let Err(error) = self.write_temp(&temp, bytes).and_then(|()| fs::rename(&temp, &path)) {
            let _ = fs::remove_file(&temp);
            return Err(error);
        }

        let written = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        self.size = self.size.saturating_sub(previous).saturating_add(written);
        tracing::debug!(cache.fingerprint = %fingerprint, cache.bytes = written, cache.size = self.size, "disk cache write");

        self.enforce_capacity(Some(fingerprint));
        Ok(())
    }

    /// Removes every file in the directory, then recomputes the size from what is left.
    pub(crate) fn clear(&mut self) {
        match fs::read_dir(&self.root) {
            Ok(items) => {
                for item in items.flatten() {
                    if !item.file_type().is_ok_and(|kind| kind.is_file()) {
                        continue;
                    }
                    if let Err(error) = self.remove(&item.file_name().to_string_lossy()) {
                        tracing::warn!(path = %item.path().display(), %error, "failed to remove file while clearing disk cache");
                    }
                }
            }
            Err(error) => tracing::warn!(%error, "failed to list disk cache directory"),
        }

        self.size = self.scan_size();
        tracing::debug!(cache.size = self.size, "disk cache cleared");
    }

    pub(crate) fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
        self.enforce_capacity(None);
    }

    /// Evicts the least recently used entries until the size fits the capacity.
    ///
    /// `keep`, or the most recent entry when `keep` is `None`, is never evicted, so a single
    /// entry larger than the capacity remains on its own.
    fn enforce_capacity(&mut self, keep: Option<Fingerprint>) {
        if self.size <= self.capacity {
            return;
        }

        let mut entries = self.entries();
        entries.sort_unstable();
        let protected = keep
            .map(|fingerprint| fingerprint.to_string())
            .or_else(|| entries.last().map(|entry| entry.name.clone()));

        for entry in entries {
            if self.size <= self.capacity {
                break;
            }
            if protected.as_deref() == Some(entry.name.as_str()) {
                continue;
            }

            match self.remove(&entry.name) {
                Ok(()) => {
                    self.size = self.size.saturating_sub(entry.len);
                    tracing::debug!(
                        cache.fingerprint = %entry.name,
                        cache.bytes = entry.len,
                        cache.size = self.size,
                        cache.capacity = self.capacity,
                        "disk cache eviction"
                    );
                }
                Err(error) => {
                    tracing::warn!(cache.fingerprint = %entry.name, %error, "failed to evict disk cache entry");
                }
            }
        }

        // Files removed behind our back leave the counter too high.
        if self.size > self.capacity {
            self.size = self.scan_size();
        }
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        #[cfg(test)]
        if self.refused.contains(name) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "removal refused"));
        }

        fs::remove_file(self.root.join(name))
    }

    fn entry_path(&self, fingerprint: Fingerprint) -> PathBuf {
        self.root.join(fingerprint.to_string())
    }

    fn now(&self) -> SystemTime {
        self.clock.as_ref().map_or_else(SystemTime::now, Clock::system_time)
    }

    fn write_temp(&self, temp: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = File::create(temp)?;
        file.write_all(bytes)?;
        file.set_modified(self.now())
    }

    fn entries(&self) -> Vec<ScannedEntry> {
        let items = match fs::read_dir(&self.root) {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!(%error, "failed to list disk cache directory");
                return Vec::new();
            }
        };

        items
            .flatten()
            .filter_map(|item| {
                let name = item.file_name().into_string().ok()?;
                if name.starts_with('.') {
                    return None;
                }
                let metadata = item.metadata().ok().filter(fs::Metadata::is_file)?;
                Some(ScannedEntry {
                    modified: metadata.modified().ok()?,
                    name,
                    len: metadata.len(),
                })
            })
            .collect()
    }

    fn scan_size(&self) -> u64 {
        self.entries().iter().map(|entry| entry.len).sum()
    }

    fn remove_temp_files(&self) {
        let Ok(items) = fs::read_dir(&self.root) else {
            return;
        };

        for item in items.flatten() {
            let name = item.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') && name.ends_with(TEMP_SUFFIX) {
                tracing::debug!(path = %item.path().display(), "removing stale temporary file");
                let _ = fs::remove_file(item.path());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::TempDir;
    use tick::ClockControl;

    use super::*;

    fn fp(key: &str) -> Fingerprint {
        Fingerprint::of(key)
    }

    fn open(dir: &TempDir, capacity: u64, control: &ClockControl) -> EntryStore {
        EntryStore::open(dir.path().to_path_buf(), capacity, Some(control.to_clock())).unwrap()
    }

    fn clock() -> ClockControl {
        ClockControl::new_at(std::time::SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000))
    }

    #[test]
    fn open_creates_nested_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("a").join("b");
        let store = EntryStore::open(root.clone(), 100, None).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn open_fails_when_root_is_a_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, b"x").unwrap();

        let error = EntryStore::open(file.join("cache"), 100, None).unwrap_err();
        assert!(error.path().ends_with("cache"));
    }

    #[test]
    fn open_counts_existing_entries_and_drops_temp_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(fp("a").to_string()), [0_u8; 7]).unwrap();
        fs::write(dir.path().join(".leftover.tmp"), [0_u8; 50]).unwrap();
        fs::write(dir.path().join(".hidden"), [0_u8; 50]).unwrap();

        let store = open(&dir, 100, &clock());
        assert_eq!(store.size(), 7);
        assert!(!dir.path().join(".leftover.tmp").exists());
        assert!(dir.path().join(".hidden").exists());
    }

    #[test]
    fn overwrite_accounts_for_previous_size() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir, 100, &clock());

        store.write(fp("k"), &[1; 10]).unwrap();
        assert_eq!(store.size(), 10);
        store.write(fp("k"), &[2; 4]).unwrap();
        assert_eq!(store.size(), 4);
        assert_eq!(store.load(fp("k")), Some(vec![2; 4]));
        store.write(fp("k"), &[3; 6]).unwrap();
        assert_eq!(store.size(), 6);
    }

    #[test]
    fn failed_write_keeps_previous_payload_and_size() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir, 100, &clock());
        store.write(fp("k"), &[1; 4]).unwrap();

        // A directory where the temporary file goes makes the write fail.
        let temp = dir.path().join(format!(".{}{TEMP_SUFFIX}", fp("k")));
        fs::create_dir(&temp).unwrap();

        store.write(fp("k"), &[2; 9]).unwrap_err();
        assert_eq!(store.size(), 4);
        assert_eq!(store.load(fp("k")), Some(vec![1; 4]));
    }

    #[test]
    fn eviction_continues_past_a_failed_removal() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 20, &control);

        store.write(fp("a"), &[0; 10]).unwrap();
        control.advance(Duration::from_secs(1));
        store.write(fp("b"), &[0; 10]).unwrap();
        control.advance(Duration::from_secs(1));
        store.refused.insert(fp("a").to_string());
        store.write(fp("c"), &[0; 10]).unwrap();

        assert_eq!(store.size(), 20);
        assert!(store.load(fp("a")).is_some());
        assert_eq!(store.load(fp("b")), None);
        assert!(store.load(fp("c")).is_some());
    }

    #[test]
    fn eviction_that_cannot_fit_resyncs_size_from_disk() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 100, &control);

        store.write(fp("a"), &[0; 10]).unwrap();
        control.advance(Duration::from_secs(1));
        store.write(fp("b"), &[0; 10]).unwrap();
        store.refused.insert(fp("a").to_string());
        store.set_capacity(5);

        assert_eq!(store.size(), 20);
        assert!(store.load(fp("a")).is_some());
        assert!(store.load(fp("b")).is_some());
    }

    #[test]
    fn clear_removes_what_it_can() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir, 100, &clock());
        store.write(fp("a"), &[0; 3]).unwrap();
        store.write(fp("b"), &[0; 4]).unwrap();
        store.refused.insert(fp("a").to_string());

        store.clear();

        assert_eq!(store.size(), 3);
        assert!(store.load(fp("a")).is_some());
        assert_eq!(store.load(fp("b")), None);
    }

    #[test]
    fn evicts_least_recently_written() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 20, &control);

        for key in ["a", "b", "c"] {
            store.write(fp(key), &[0; 10]).unwrap();
            control.advance(Duration::from_secs(1));
        }

        assert_eq!(store.size(), 20);
        assert_eq!(store.load(fp("a")), None);
        assert!(store.load(fp("b")).is_some());
        assert!(store.load(fp("c")).is_some());
    }

    #[test]
    fn touch_refreshes_recency() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 20, &control);

        store.write(fp("a"), &[0; 10]).unwrap();
        control.advance(Duration::from_secs(1));
        store.write(fp("b"), &[0; 10]).unwrap();
        control.advance(Duration::from_secs(1));
        store.touch(fp("a"));
        control.advance(Duration::from_secs(1));
        store.write(fp("c"), &[0; 10]).unwrap();

        assert!(store.load(fp("a")).is_some());
        assert_eq!(store.load(fp("b")), None);
    }

    #[test]
    fn equal_times_evict_in_name_order() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 20, &control);

        let mut keys = ["x", "y", "z"].map(fp);
        keys.sort_unstable_by_key(ToString::to_string);
        store.write(keys[1], &[0; 10]).unwrap();
        store.write(keys[0], &[0; 10]).unwrap();
        store.write(keys[2], &[0; 10]).unwrap();

        assert_eq!(store.load(keys[0]), None);
        assert!(store.load(keys[1]).is_some());
    }

    #[test]
    fn oversize_entry_survives_alone() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 5, &control);

        store.write(fp("big"), &[0; 10]).unwrap();
        assert_eq!(store.size(), 10);
        assert!(store.load(fp("big")).is_some());

        control.advance(Duration::from_secs(1));
        store.write(fp("bigger"), &[0; 12]).unwrap();
        assert_eq!(store.size(), 12);
        assert_eq!(store.load(fp("big")), None);
    }

    #[test]
    fn lowering_capacity_keeps_newest() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 100, &control);

        for key in ["a", "b", "c"] {
            store.write(fp(key), &[0; 10]).unwrap();
            control.advance(Duration::from_secs(1));
        }
        store.set_capacity(15);

        assert_eq!(store.size(), 10);
        assert!(store.load(fp("c")).is_some());
    }

    #[test]
    fn discard_and_clear_update_size() {
        let dir = TempDir::new().unwrap();
        let mut store = open(&dir, 100, &clock());
        store.write(fp("a"), &[0; 3]).unwrap();
        store.write(fp("b"), &[0; 4]).unwrap();

        assert!(store.discard(fp("a")));
        assert!(!store.discard(fp("a")));
        assert_eq!(store.size(), 4);

        store.clear();
        assert_eq!(store.size(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn writes_stamp_modification_time_from_clock() {
        let dir = TempDir::new().unwrap();
        let control = clock();
        let mut store = open(&dir, 100, &control);

        store.write(fp("a"), b"payload").unwrap();
        let modified = fs::metadata(dir.path().join(fp("a").to_string()))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(modified, control.to_clock().system_time());
    }
}
