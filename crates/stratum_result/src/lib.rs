// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Single-assignment asynchronous results.
//!
//! An [`AsyncResult`] is the consuming half of a [`Promise`]: it starts pending and settles once,
//! as a success, a failure, or a cancellation. Callbacks registered on it fire exactly once, in
//! registration order, on the result's [`CompletionContext`]. [`merge_all`] joins many results
//! into one that keeps input order and fails on the first failure.
//!
//! # Quick Start
//!
//! ```
//! use stratum_result::{AsyncResult, Outcome, Promise, merge_all};
//!
//! let promise = Promise::new();
//! let pending = promise.result();
//!
//! let merged = merge_all([AsyncResult::succeeded(1), pending]);
//! assert!(merged.is_pending());
//!
//! promise.resolve(2);
//! assert!(matches!(merged.outcome(), Some(Outcome::Succeeded(v)) if v == vec![1, 2]));
//! ```
//!
//! # Features
//!
//! - `tokio`: Enables [`CompletionContext::tokio`] for delivering callbacks as Tokio tasks.

mod async_result;
mod context;
pub mod error;
mod outcome;
mod sequence;

#[doc(inline)]
pub use async_result::{AsyncResult, Promise, panic_message};
#[doc(inline)]
pub use context::CompletionContext;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use outcome::Outcome;
#[doc(inline)]
pub use sequence::merge_all;
