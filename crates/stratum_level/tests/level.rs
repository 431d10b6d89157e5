// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for composing levels whose lookups settle later.

use std::collections::HashMap;
use std::sync::{Arc, mpsc};
use std::thread;

use parking_lot::Mutex;
use stratum_level::{AsyncResult, CacheLevel, CacheLevelExt, Deferred, Outcome, Promise, PromotionPolicy, miss};

/// A level that answers lookups from a background thread.
#[derive(Clone, Default)]
struct ThreadedLevel {
    data: Arc<Mutex<HashMap<String, String>>>,
    sets: Arc<Mutex<Vec<String>>>,
}

impl CacheLevel<String, String> for ThreadedLevel {
    fn get(&self, key: &String) -> AsyncResult<String> {
        let promise = Promise::new();
        let result = promise.result();
        let found = self.data.lock().get(key).cloned();
        thread::spawn(move || match found {
            Some(value) => promise.resolve(value),
            None => promise.fail(miss()),
        });
        result
    }

    fn set(&self, value: String, key: &String) {
        self.sets.lock().push(key.clone());
        self.data.lock().insert(key.clone(), value);
    }

    fn clear(&self) {
        self.data.lock().clear();
    }

    fn on_memory_warning(&self) {}
}

fn key(name: &str) -> String {
    name.to_string()
}

#[test]
fn fallback_across_threads_promotes_into_primary() {
    let primary = ThreadedLevel::default();
    let secondary = ThreadedLevel::default();
    secondary.set(key("value"), &key("k"));

    let composed = primary.clone().fallback(secondary);
    let outcome = futures::executor::block_on(composed.get(&key("k")));

    assert_eq!(outcome.into_value().as_deref(), Some("value"));
    assert_eq!(primary.data.lock().get("k").map(String::as_str), Some("value"));
}

#[test]
fn three_levels_compose_into_one() {
    let top = ThreadedLevel::default();
    let middle = ThreadedLevel::default();
    let bottom = ThreadedLevel::default();
    bottom.set(key("deep"), &key("k"));

    let composed = top
        .clone()
        .fallback(middle.clone().fallback(bottom).promotion_policy(PromotionPolicy::never()))
        .into_dynamic();

    let outcome = futures::executor::block_on(composed.get(&key("k")));
    assert_eq!(outcome.into_value().as_deref(), Some("deep"));
    assert!(top.data.lock().contains_key("k"));
    assert!(!middle.data.lock().contains_key("k"));
}

#[test]
fn get_all_joins_threaded_lookups_in_key_order() {
    let level = ThreadedLevel::default();
    for name in ["a", "b", "c"] {
        level.set(name.to_uppercase(), &key(name));
    }

    let keys = [key("c"), key("a"), key("b")];
    let outcome = futures::executor::block_on(level.get_all(&keys));
    assert_eq!(outcome.into_value(), Some(vec![key("C"), key("A"), key("B")]));
}

#[test]
fn get_or_set_fills_miss_from_producer() {
    let level = ThreadedLevel::default();
    let (tx, rx) = mpsc::channel();

    let result = level.get_or_set(
        &key("k"),
        Deferred::new(move || {
            tx.send(()).expect("receiver alive");
            key("produced")
        }),
    );

    let outcome = futures::executor::block_on(result);
    assert_eq!(outcome.into_value().as_deref(), Some("produced"));
    assert_eq!(rx.try_iter().count(), 1);
    assert_eq!(*level.sets.lock(), vec![key("k")]);
}

#[test]
fn arc_wrapped_level_is_a_level() {
    let shared = Arc::new(ThreadedLevel::default());
    shared.set(key("v"), &key("k"));

    let outcome: Outcome<String> = futures::executor::block_on(CacheLevel::get(&shared, &key("k")));
    assert!(outcome.is_succeeded());

    shared.clear();
    let outcome = futures::executor::block_on(shared.get(&key("k")));
    assert!(outcome.is_failed());
}
