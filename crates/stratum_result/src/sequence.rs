// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Joining many results into one.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{AsyncResult, Outcome, Promise};

struct Slots<V> {
    values: Vec<Option<V>>,
    remaining: usize,
}

impl<V> Slots<V> {
    /// Stores the value for `index` and hands back the full list once every slot is filled.
    fn fill(&mut self, index: usize, value: V) -> Option<Vec<V>> {
        if let Some(slot) = self.values.get_mut(index)
            && slot.is_none()
        {
            *slot = Some(value);
            self.remaining -= 1;
        }

        if self.remaining > 0 {
            return None;
        }

        Some(self.values.drain(..).flatten().collect())
    }
}

/// Joins an ordered sequence of results into one result holding all of their values.
///
/// The merged result succeeds once every input has succeeded, with the values in input order,
/// whatever order the inputs completed in. It fails or cancels as soon as the first input fails
/// or cancels, without waiting for the rest; later failures and cancellations are ignored. An
/// empty input succeeds immediately with an empty list.
///
/// # Examples
///
/// ```
/// use stratum_result::{Outcome, Promise, merge_all};
///
/// let first = Promise::new();
/// let second = Promise::new();
/// let merged = merge_all([first.result(), second.result()]);
///
/// second.resolve("b");
/// first.resolve("a");
///
/// let outcome = futures::executor::block_on(merged);
/// assert_eq!(outcome.into_value(), Some(vec!["a", "b"]));
/// ```
pub fn merge_all<V, I>(results: I) -> AsyncResult<Vec<V>>
where
    V: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = AsyncResult<V>>,
{
    let results: Vec<_> = results.into_iter().collect();
    if results.is_empty() {
        return AsyncResult::succeeded(Vec::new());
    }

    let promise = Promise::new();
    let merged = promise.result();
    let slots = Arc::new(Mutex::new(Slots {
        values: results.iter().map(|_| None).collect(),
        remaining: results.len(),
    }));

    for (index, result) in results.into_iter().enumerate() {
        let promise = promise.clone();
        let slots = Arc::clone(&slots);
        result.on_completion(move |outcome| {
            let _settled = match outcome {
                Outcome::Succeeded(value) => {
                    let complete = slots.lock().fill(index, value.clone());
                    complete.is_some_and(|values| promise.resolve(values))
                }
                Outcome::Failed(error) => promise.fail(error.clone()),
                Outcome::Cancelled => promise.cancel(),
            };
        });
    }

    merged
}
