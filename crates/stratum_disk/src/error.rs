// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A disk level could not be opened.
///
/// Returned by [`DiskLevelBuilder::build`](crate::DiskLevelBuilder::build) when the cache
/// directory cannot be created or the worker thread cannot be started. The underlying I/O error
/// is available through [`std::error::Error::source`].
#[ohno::error]
#[display("failed to open disk cache at {path}")]
pub struct OpenError {
    path: String,
}

impl OpenError {
    /// Returns the directory that could not be opened.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}
