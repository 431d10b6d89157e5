// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! The cache level contract and the operators that compose levels.
//!
//! A cache is a stack of levels: fast and small at the top, slow and large at the bottom. Each
//! level implements [`CacheLevel`], whose lookups return an [`AsyncResult`] immediately instead of
//! blocking. Levels compose through [`CacheLevelExt`]:
//!
//! - [`CacheLevelExt::fallback`] checks one level and falls back to another, promoting hits
//!   upward according to a [`PromotionPolicy`].
//! - [`CacheLevelExt::get_all`] joins lookups for many keys.
//! - [`CacheLevelExt::get_or_set`] fills a miss from a [`Deferred`] producer.
//! - [`CacheLevelExt::into_dynamic`] erases the concrete type behind a [`DynamicLevel`].
//!
//! # Implementing a Cache Level
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Mutex;
//!
//! use stratum_level::{AsyncResult, CacheLevel, miss};
//!
//! struct SimpleLevel(Mutex<HashMap<String, i32>>);
//!
//! impl CacheLevel<String, i32> for SimpleLevel {
//!     fn get(&self, key: &String) -> AsyncResult<i32> {
//!         match self.0.lock().unwrap().get(key) {
//!             Some(value) => AsyncResult::succeeded(*value),
//!             None => AsyncResult::failed(miss()),
//!         }
//!     }
//!
//!     fn set(&self, value: i32, key: &String) {
//!         self.0.lock().unwrap().insert(key.clone(), value);
//!     }
//!
//!     fn clear(&self) {
//!         self.0.lock().unwrap().clear();
//!     }
//!
//!     fn on_memory_warning(&self) {
//!         self.clear();
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - `test-util`: Enables the [`testing`] module with `MockLevel` for testing.

mod deferred;
mod dynamic;
mod ext;
mod fallback;
mod level;

#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

#[doc(inline)]
pub use deferred::Deferred;
#[doc(inline)]
pub use dynamic::DynamicLevel;
#[doc(inline)]
pub use ext::CacheLevelExt;
#[doc(inline)]
pub use fallback::{Fallback, PromotionPolicy};
#[doc(inline)]
pub use level::CacheLevel;
#[doc(inline)]
pub use stratum_result::{AsyncResult, CompletionContext, Error, Outcome, Promise};

/// Returns the error a level reports when it does not hold a key.
///
/// A miss is an ordinary failure: callers cannot distinguish it from other lookup failures, and
/// composed levels treat both the same way.
#[must_use]
pub fn miss() -> Error {
    Error::from_message("cache miss")
}
