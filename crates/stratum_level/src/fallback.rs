// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Two-level composition: check a primary level, then fall back to a secondary one.

use std::{fmt::Debug, marker::PhantomData, sync::Arc};

use stratum_result::{AsyncResult, Outcome, Promise};

use crate::CacheLevel;

/// Policy for promoting values from the secondary level into the primary one.
///
/// When the primary level misses and the secondary level hits, the policy decides whether the
/// value is written back to the primary level so the next lookup is served from there.
///
/// # Examples
///
/// ```
/// use stratum_level::PromotionPolicy;
///
/// // Always promote (default)
/// let policy = PromotionPolicy::<String>::always();
///
/// // Never promote
/// let policy = PromotionPolicy::<String>::never();
///
/// // Promote short values only
/// let policy = PromotionPolicy::when(|value: &String| value.len() < 1024);
/// ```
pub struct PromotionPolicy<V>(PolicyKind<V>);

enum PolicyKind<V> {
    Always,
    Never,
    When(Arc<dyn Fn(&V) -> bool + Send + Sync>),
}

impl<V> Default for PromotionPolicy<V> {
    fn default() -> Self {
        Self::always()
    }
}

impl<V> Debug for PromotionPolicy<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PromotionPolicy").field(&self.0).finish()
    }
}

impl<V> Debug for PolicyKind<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "Always"),
            Self::Never => write!(f, "Never"),
            Self::When(_) => write!(f, "When(<closure>)"),
        }
    }
}

impl<V> PromotionPolicy<V> {
    /// Creates a policy that always promotes secondary hits.
    #[must_use]
    pub fn always() -> Self {
        Self(PolicyKind::Always)
    }

    /// Creates a policy that never promotes secondary hits.
    #[must_use]
    pub fn never() -> Self {
        Self(PolicyKind::Never)
    }

    /// Creates a policy that promotes the values for which `predicate` returns `true`.
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Self(PolicyKind::When(Arc::new(predicate)))
    }

    #[inline]
    pub(crate) fn should_promote(&self, value: &V) -> bool {
        match &self.0 {
            PolicyKind::Always => true,
            PolicyKind::Never => false,
            PolicyKind::When(predicate) => predicate(value),
        }
    }
}

struct FallbackInner<V, P, S> {
    primary: P,
    secondary: S,
    policy: PromotionPolicy<V>,
}

/// A level that checks `primary` first and queries `secondary` on a miss.
///
/// A secondary hit is written back to the primary level when the [`PromotionPolicy`] allows it.
/// A cancelled primary lookup cancels the composed lookup; only failures fall through. Writes,
/// clears, and memory warnings go to both levels.
///
/// Construct this with [`CacheLevelExt::fallback`](crate::CacheLevelExt::fallback).
pub struct Fallback<K, V, P, S> {
    inner: Arc<FallbackInner<V, P, S>>,
    _key: PhantomData<fn(&K)>,
}

impl<K, V, P, S> Debug for Fallback<K, V, P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fallback")
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

impl<K, V, P, S> Clone for Fallback<K, V, P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _key: PhantomData,
        }
    }
}

impl<K, V, P, S> Fallback<K, V, P, S> {
    pub(crate) fn new(primary: P, secondary: S) -> Self {
        Self {
            inner: Arc::new(FallbackInner {
                primary,
                secondary,
                policy: PromotionPolicy::always(),
            }),
            _key: PhantomData,
        }
    }

    /// Replaces the promotion policy.
    ///
    /// Call this right after [`fallback`](crate::CacheLevelExt::fallback); once the level has
    /// been cloned the policy can no longer change and the call is ignored.
    #[must_use]
    pub fn promotion_policy(self, policy: PromotionPolicy<V>) -> Self {
        // Only called while building, before any clone of `inner` exists.
        match Arc::try_unwrap(self.inner) {
            Ok(inner) => Self {
                inner: Arc::new(FallbackInner { policy, ..inner }),
                _key: PhantomData,
            },
            Err(shared) => {
                tracing::warn!("promotion policy ignored: fallback level is already shared");
                Self {
                    inner: shared,
                    _key: PhantomData,
                }
            }
        }
    }

    /// Returns the primary level.
    #[must_use]
    pub fn primary(&self) -> &P {
        &self.inner.primary
    }

    /// Returns the secondary level.
    #[must_use]
    pub fn secondary(&self) -> &S {
        &self.inner.secondary
    }
}

impl<K, V, P, S> CacheLevel<K, V> for Fallback<K, V, P, S>
where
    K: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    P: CacheLevel<K, V> + 'static,
    S: CacheLevel<K, V> + 'static,
{
    fn get(&self, key: &K) -> AsyncResult<V> {
        let promise = Promise::new();
        let composed = promise.result();
        let inner = Arc::clone(&self.inner);
        let key = key.clone();

        self.inner.primary.get(&key).on_completion(move |outcome| match outcome {
            Outcome::Succeeded(value) => {
                let _settled = promise.resolve(value.clone());
            }
            Outcome::Cancelled => {
                let _settled = promise.cancel();
            }
            Outcome::Failed(_) => {
                let secondary = inner.secondary.get(&key);
                secondary.on_completion(move |outcome| {
                    if let Outcome::Succeeded(value) = outcome
                        && inner.policy.should_promote(value)
                    {
                        tracing::debug!("promoting secondary hit into primary level");
                        inner.primary.set(value.clone(), &key);
                    }
                    let _settled = promise.settle(outcome.clone());
                });
            }
        });

        composed
    }

    fn set(&self, value: V, key: &K) {
        self.inner.primary.set(value.clone(), key);
        self.inner.secondary.set(value, key);
    }

    fn clear(&self) {
        self.inner.primary.clear();
        self.inner.secondary.clear();
    }

    fn on_memory_warning(&self) {
        self.inner.primary.on_memory_warning();
        self.inner.secondary.on_memory_warning();
    }
}
