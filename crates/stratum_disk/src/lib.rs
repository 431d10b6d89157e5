// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A persistent cache level backed by a directory of files.
//!
//! [`DiskLevel`] implements [`CacheLevel`](stratum_level::CacheLevel) with one file per entry.
//! Keys map to file names through their [`Fingerprint`]; values map to file contents through a
//! [`Codec`]. The level enforces a byte capacity by evicting the least recently used files, and
//! serializes all of its file-system work on one worker thread so the recorded size never races
//! with the files it describes.
//!
//! # Quick Start
//!
//! ```
//! use stratum_disk::{DiskLevel, JsonCodec};
//! use stratum_level::CacheLevel;
//!
//! let dir = tempfile::tempdir()?;
//! let level = DiskLevel::<String, Vec<u32>, _>::builder(dir.path(), JsonCodec::new())
//!     .capacity(10 * 1024 * 1024)
//!     .build()?;
//!
//! level.set(vec![1, 2, 3], &"primes".to_string());
//! let outcome = futures::executor::block_on(level.get(&"primes".to_string()));
//! assert_eq!(outcome.into_value(), Some(vec![1, 2, 3]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Disk levels usually sit below a memory level:
//!
//! ```ignore
//! let cache = memory.fallback(disk);
//! ```
//!
//! # Features
//!
//! - `json` (default): Enables [`JsonCodec`] for serde-compatible values.

mod builder;
mod codec;
mod error;
mod fingerprint;
mod level;
mod queue;
mod store;

#[doc(inline)]
pub use builder::DiskLevelBuilder;
#[cfg(feature = "json")]
#[doc(inline)]
pub use codec::JsonCodec;
#[doc(inline)]
pub use codec::{Codec, CodecError, RawCodec, Utf8Codec};
#[doc(inline)]
pub use error::OpenError;
#[doc(inline)]
pub use fingerprint::Fingerprint;
#[doc(inline)]
pub use level::DiskLevel;

/// The capacity of a disk level when none is configured: 100 MiB.
pub const DEFAULT_CAPACITY: u64 = 100 * 1024 * 1024;
