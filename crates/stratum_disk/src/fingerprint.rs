// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display};

use xxhash_rust::xxh3::xxh3_128;

/// The on-disk identity of a cache key.
///
/// A fingerprint is the XXH3-128 hash of the UTF-8 bytes of the key's [`Display`] form. It
/// renders as 32 lowercase hex digits, which is also the name of the entry's file. The hash is
/// fixed so a cache directory stays readable across restarts and releases.
///
/// # Examples
///
/// ```
/// use stratum_disk::Fingerprint;
///
/// let fingerprint = Fingerprint::of(&"user:42");
/// assert_eq!(fingerprint.to_string().len(), 32);
/// assert_eq!(fingerprint, Fingerprint::of(&String::from("user:42")));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Computes the fingerprint of `key`.
    #[must_use]
    pub fn of<K: Display + ?Sized>(key: &K) -> Self {
        Self(xxh3_128(key.to_string().as_bytes()))
    }

    /// Returns the raw 128-bit hash.
    #[must_use]
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
