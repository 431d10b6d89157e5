// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The failure reason carried by an [`AsyncResult`](crate::AsyncResult).

/// The reason an asynchronous operation failed.
///
/// This is an opaque, clonable error. A single failure fans out to every callback registered on a
/// result, so the same reason is handed to many observers. Use [`std::error::Error::source()`] to
/// reach the underlying cause if there is one.
///
/// # Example
///
/// ```
/// use stratum_result::Error;
///
/// let error = Error::from_message("lookup failed");
/// let copy = error.clone();
/// assert_eq!(error.to_string(), copy.to_string());
/// ```
#[ohno::error]
#[derive(Clone)]
pub struct Error {}

impl Error {
    /// Creates an error from any type that can be converted to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_result::Error;
    ///
    /// let error = Error::from_message("operation failed");
    /// assert!(error.to_string().contains("operation failed"));
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for operations that surface an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_cause_message() {
        let error = Error::from_message("disk unavailable");
        let display = format!("{error}");
        assert!(display.contains("disk unavailable"), "got: {display}");
    }

    #[test]
    fn clone_keeps_cause_message() {
        let error = Error::from_message("shared reason");
        let cloned = error.clone();
        assert!(format!("{cloned:?}").contains("shared reason"));
    }
}
