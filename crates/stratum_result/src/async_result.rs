// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Single-assignment [`Promise`] and [`AsyncResult`] pair.

use std::any::Any;
use std::fmt::Debug;
use std::mem;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

use crate::{CompletionContext, Error, Outcome};

type Callback<V> = Box<dyn FnOnce(&Outcome<V>) + Send>;

enum State<V> {
    Pending { callbacks: Vec<Callback<V>>, wakers: Vec<Waker> },
    Settled(Arc<Outcome<V>>),
}

impl<V> State<V> {
    fn name(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "Pending",
            Self::Settled(outcome) => match **outcome {
                Outcome::Succeeded(_) => "Succeeded",
                Outcome::Failed(_) => "Failed",
                Outcome::Cancelled => "Cancelled",
            },
        }
    }
}

struct Shared<V> {
    state: Mutex<State<V>>,
    context: CompletionContext,
}

impl<V> Shared<V>
where
    V: Send + Sync + 'static,
{
    fn new(context: CompletionContext) -> Self {
        Self {
            state: Mutex::new(State::Pending {
                callbacks: Vec::new(),
                wakers: Vec::new(),
            }),
            context,
        }
    }

    fn settled(outcome: Outcome<V>) -> Self {
        Self {
            state: Mutex::new(State::Settled(Arc::new(outcome))),
            context: CompletionContext::inline(),
        }
    }

    /// Moves a pending result into `outcome`. Returns `false` if it had already settled.
    fn settle(&self, outcome: Outcome<V>) -> bool {
        let outcome = Arc::new(outcome);
        let previous = {
            let mut state = self.state.lock();
            if matches!(*state, State::Settled(_)) {
                return false;
            }
            mem::replace(&mut *state, State::Settled(Arc::clone(&outcome)))
        };

        let State::Pending { callbacks, wakers } = previous else {
            return false;
        };

        for waker in wakers {
            waker.wake();
        }

        if !callbacks.is_empty() {
            self.context.dispatch(move || {
                for callback in callbacks {
                    // A panicking callback must not starve the ones registered after it.
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(outcome.as_ref()))) {
                        tracing::error!(panic = panic_message(payload.as_ref()), "result callback panicked");
                    }
                }
            });
        }

        true
    }

    fn register(&self, callback: Callback<V>) {
        let settled = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending { callbacks, .. } => {
                    callbacks.push(callback);
                    return;
                }
                State::Settled(outcome) => Arc::clone(outcome),
            }
        };

        // Already terminal: run right here, on the registering thread.
        callback(settled.as_ref());
    }
}

/// Extracts the message of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

/// The producing half of an [`AsyncResult`].
///
/// A promise settles its result exactly once. Every later attempt to resolve, fail, or cancel is
/// ignored and reported as `false`.
///
/// # Examples
///
/// ```
/// use stratum_result::{Error, Promise};
///
/// let promise = Promise::new();
/// let result = promise.result();
///
/// assert!(promise.resolve(42));
/// assert!(!promise.fail(Error::from_message("too late")));
/// assert_eq!(result.outcome().and_then(|o| o.into_value()), Some(42));
/// ```
pub struct Promise<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for Promise<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> Debug for Promise<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.shared.state.lock().name())
            .field("context", &self.shared.context)
            .finish()
    }
}

impl<V> Default for Promise<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Promise<V>
where
    V: Send + Sync + 'static,
{
    /// Creates a pending promise whose callbacks run inline on the settling thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(CompletionContext::inline())
    }

    /// Creates a pending promise whose callbacks run on `context`.
    #[must_use]
    pub fn with_context(context: CompletionContext) -> Self {
        Self {
            shared: Arc::new(Shared::new(context)),
        }
    }

    /// Returns the consuming half bound to this promise.
    #[must_use]
    pub fn result(&self) -> AsyncResult<V> {
        AsyncResult {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Settles the result with a value. Returns `false` if it had already settled.
    pub fn resolve(&self, value: V) -> bool {
        self.shared.settle(Outcome::Succeeded(value))
    }

    /// Settles the result with a failure. Returns `false` if it had already settled.
    pub fn fail(&self, error: Error) -> bool {
        self.shared.settle(Outcome::Failed(error))
    }

    /// Settles the result as cancelled. Returns `false` if it had already settled.
    pub fn cancel(&self) -> bool {
        self.shared.settle(Outcome::Cancelled)
    }

    /// Settles the result with a ready-made outcome. Returns `false` if it had already settled.
    pub fn settle(&self, outcome: Outcome<V>) -> bool {
        self.shared.settle(outcome)
    }
}

/// The eventual outcome of one asynchronous operation.
///
/// An `AsyncResult` starts pending and moves once to [`Outcome::Succeeded`], [`Outcome::Failed`]
/// or [`Outcome::Cancelled`]. Callbacks registered while pending fire exactly once, in
/// registration order, on the completion context of the result. Callbacks registered after
/// settlement run immediately on the registering thread.
///
/// When `V: Clone`, an `AsyncResult` is also a [`Future`] resolving to its [`Outcome`].
///
/// # Examples
///
/// ```
/// use stratum_result::{Outcome, Promise};
///
/// let promise = Promise::new();
/// let result = promise.result();
///
/// result
///     .on_success(|value: &u32| println!("got {value}"))
///     .on_failure(|error| eprintln!("failed: {error}"))
///     .on_cancel(|| eprintln!("cancelled"));
///
/// promise.resolve(5);
/// let outcome = futures::executor::block_on(result);
/// assert!(matches!(outcome, Outcome::Succeeded(5)));
/// ```
pub struct AsyncResult<V> {
    shared: Arc<Shared<V>>,
}

impl<V> Clone for AsyncResult<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<V> Debug for AsyncResult<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncResult")
            .field("state", &self.shared.state.lock().name())
            .field("context", &self.shared.context)
            .finish()
    }
}

impl<V> AsyncResult<V>
where
    V: Send + Sync + 'static,
{
    /// Creates a result that has already succeeded.
    #[must_use]
    pub fn succeeded(value: V) -> Self {
        Self::from_outcome(Outcome::Succeeded(value))
    }

    /// Creates a result that has already failed.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self::from_outcome(Outcome::Failed(error))
    }

    /// Creates a result that has already been cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::from_outcome(Outcome::Cancelled)
    }

    /// Creates a result that has already settled with `outcome`.
    #[must_use]
    pub fn from_outcome(outcome: Outcome<V>) -> Self {
        Self {
            shared: Arc::new(Shared::settled(outcome)),
        }
    }

    /// Returns `true` while the result has not settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(*self.shared.state.lock(), State::Pending { .. })
    }

    /// Cancels the result. Returns `false` if it had already settled.
    pub fn cancel(&self) -> bool {
        self.shared.settle(Outcome::Cancelled)
    }

    /// Registers a callback that receives the value if the result succeeds.
    pub fn on_success(&self, callback: impl FnOnce(&V) + Send + 'static) -> &Self {
        self.on_completion(move |outcome| {
            if let Outcome::Succeeded(value) = outcome {
                callback(value);
            }
        })
    }

    /// Registers a callback that receives the reason if the result fails.
    pub fn on_failure(&self, callback: impl FnOnce(&Error) + Send + 'static) -> &Self {
        self.on_completion(move |outcome| {
            if let Outcome::Failed(error) = outcome {
                callback(error);
            }
        })
    }

    /// Registers a callback that runs if the result is cancelled.
    pub fn on_cancel(&self, callback: impl FnOnce() + Send + 'static) -> &Self {
        self.on_completion(move |outcome| {
            if outcome.is_cancelled() {
                callback();
            }
        })
    }

    /// Registers a callback that receives whichever outcome the result settles with.
    pub fn on_completion(&self, callback: impl FnOnce(&Outcome<V>) + Send + 'static) -> &Self {
        self.shared.register(Box::new(callback));
        self
    }

    /// Derives a result that succeeds with `transform(&value)`.
    ///
    /// Failure and cancellation of this result pass through to the derived one unchanged. The
    /// derived result settles on this result's completion context, so its own callbacks run
    /// inline there.
    ///
    /// # Examples
    ///
    /// ```
    /// use stratum_result::AsyncResult;
    ///
    /// let length = AsyncResult::succeeded("hello".to_string()).map(|s| s.len());
    /// assert_eq!(length.outcome().and_then(|o| o.into_value()), Some(5));
    /// ```
    #[must_use]
    pub fn map<U, F>(&self, transform: F) -> AsyncResult<U>
    where
        U: Send + Sync + 'static,
        F: FnOnce(&V) -> U + Send + 'static,
    {
        let promise = Promise::new();
        let mapped = promise.result();
        self.on_completion(move |outcome| {
            let _settled = match outcome {
                Outcome::Succeeded(value) => promise.resolve(transform(value)),
                Outcome::Failed(error) => promise.fail(error.clone()),
                Outcome::Cancelled => promise.cancel(),
            };
        });
        mapped
    }
}

impl<V> AsyncResult<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns a copy of the outcome if the result has settled.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<V>> {
        match &*self.shared.state.lock() {
            State::Pending { .. } => None,
            State::Settled(outcome) => Some((**outcome).clone()),
        }
    }

    /// Derives a result with the same outcome whose callbacks run on `context`.
    #[must_use]
    pub fn deliver_on(&self, context: CompletionContext) -> Self {
        let promise = Promise::with_context(context);
        let relayed = promise.result();
        self.on_completion(move |outcome| {
            let _settled = promise.settle(outcome.clone());
        });
        relayed
    }
}

impl<V> Future for AsyncResult<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = Outcome<V>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        match &mut *state {
            State::Settled(outcome) => Poll::Ready((**outcome).clone()),
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
