// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::Error;

/// The terminal state of an [`AsyncResult`](crate::AsyncResult).
///
/// # Examples
///
/// ```
/// use stratum_result::Outcome;
///
/// let outcome = Outcome::Succeeded(7);
/// assert_eq!(outcome.value(), Some(&7));
/// assert!(!outcome.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub enum Outcome<V> {
    /// The operation produced a value.
    Succeeded(V),
    /// The operation failed with the given reason.
    Failed(Error),
    /// The operation was cancelled before producing a value.
    Cancelled,
}

impl<V> Outcome<V> {
    /// Returns `true` if the operation produced a value.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    /// Returns `true` if the operation failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns `true` if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the value, if the operation succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Consumes the outcome and returns the value, if the operation succeeded.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) | Self::Cancelled => None,
        }
    }

    /// Returns the failure reason, if the operation failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Succeeded(_) | Self::Cancelled => None,
        }
    }

    /// Converts the outcome into a [`Result`](crate::Result).
    ///
    /// Cancellation becomes an error that says so.
    ///
    /// # Errors
    ///
    /// Returns the failure reason, or a cancellation error, if the operation did not succeed.
    pub fn into_result(self) -> crate::Result<V> {
        match self {
            Self::Succeeded(value) => Ok(value),
            Self::Failed(error) => Err(error),
            Self::Cancelled => Err(Error::from_message("operation was cancelled")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_match_variant() {
        let succeeded = Outcome::Succeeded("v");
        assert!(succeeded.is_succeeded());
        assert_eq!(succeeded.value(), Some(&"v"));
        assert!(succeeded.error().is_none());

        let failed: Outcome<&str> = Outcome::Failed(Error::from_message("boom"));
        assert!(failed.is_failed());
        assert!(failed.value().is_none());
        assert!(failed.error().is_some());

        let cancelled: Outcome<&str> = Outcome::Cancelled;
        assert!(cancelled.is_cancelled());
        assert!(cancelled.into_value().is_none());
    }

    #[test]
    fn into_result_reports_cancellation() {
        let err = Outcome::<u8>::Cancelled.into_result().expect_err("cancelled must be an error");
        assert!(err.to_string().contains("cancelled"));
        assert_eq!(Outcome::Succeeded(3).into_result().expect("succeeded"), 3);
    }
}
