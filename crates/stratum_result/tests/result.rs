// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for results, contexts, and merging.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use anyspawn::Spawner;
use stratum_result::{AsyncResult, CompletionContext, Error, Outcome, Promise, merge_all};

fn thread_spawner() -> Spawner {
    Spawner::new_custom("test_thread", |fut| {
        thread::spawn(move || futures::executor::block_on(fut));
    })
}

/// Every permutation of `0..n`, built by repeated insertion.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    (0..n).fold(vec![Vec::new()], |acc, item| {
        acc.into_iter()
            .flat_map(|perm| {
                (0..=perm.len()).map(move |at| {
                    let mut next = perm.clone();
                    next.insert(at, item);
                    next
                })
            })
            .collect()
    })
}

#[test]
fn merge_preserves_input_order_for_every_completion_order() {
    for order in permutations(4) {
        let promises: Vec<Promise<usize>> = (0..4).map(|_| Promise::new()).collect();
        let merged = merge_all(promises.iter().map(Promise::result));

        for &index in &order {
            promises[index].resolve(index + 100);
        }

        assert_eq!(
            merged.outcome().and_then(Outcome::into_value),
            Some(vec![100, 101, 102, 103]),
            "completion order {order:?}"
        );
    }
}

#[test]
fn merge_reports_earliest_failure_not_first_in_list() {
    for order in permutations(3) {
        let promises: Vec<Promise<u8>> = (0..3).map(|_| Promise::new()).collect();
        let merged = merge_all(promises.iter().map(Promise::result));

        for &index in &order {
            promises[index].fail(Error::from_message(format!("failure {index}")));
        }

        let error = merged
            .outcome()
            .and_then(|o| o.error().cloned())
            .expect("merge should fail");
        assert!(
            error.to_string().contains(&format!("failure {}", order[0])),
            "order {order:?} produced {error}"
        );
    }
}

#[test]
fn merge_of_results_settled_on_other_threads() {
    let promises: Vec<Promise<u32>> = (0..8).map(|_| Promise::new()).collect();
    let merged = merge_all(promises.iter().map(Promise::result));

    let workers: Vec<_> = promises
        .into_iter()
        .enumerate()
        .rev()
        .map(|(index, promise)| {
            thread::spawn(move || {
                let value = u32::try_from(index).expect("small index");
                promise.resolve(value * value);
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let outcome = futures::executor::block_on(merged);
    assert_eq!(outcome.into_value(), Some(vec![0, 1, 4, 9, 16, 25, 36, 49]));
}

#[test]
fn callbacks_run_on_spawner_context_in_order() {
    let promise = Promise::with_context(CompletionContext::spawner(thread_spawner()));
    let result = promise.result();
    let (tx, rx) = mpsc::channel();

    for index in 0..3 {
        let tx = tx.clone();
        result.on_success(move |value: &&str| {
            tx.send((index, *value, thread::current().id())).expect("receiver alive");
        });
    }
    drop(tx);

    let settling_thread = thread::current().id();
    promise.resolve("ready");

    let delivered: Vec<_> = rx.iter().collect();
    assert_eq!(delivered.len(), 3);
    assert_eq!(delivered.iter().map(|(i, _, _)| *i).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(delivered.iter().all(|(_, v, t)| *v == "ready" && *t != settling_thread));
}

#[test]
fn deliver_on_moves_callbacks_to_another_context() {
    let promise: Promise<()> = Promise::new();
    let relayed = promise.result().deliver_on(CompletionContext::spawner(thread_spawner()));
    let (tx, rx) = mpsc::channel();

    relayed.on_failure(move |error| {
        tx.send((error.to_string(), thread::current().id())).expect("receiver alive");
    });
    promise.fail(Error::from_message("relayed failure"));

    let (message, ran_on) = rx.recv().expect("failure should be delivered");
    assert!(message.contains("relayed failure"));
    assert_ne!(ran_on, thread::current().id());
}

#[test]
fn settled_results_never_refire() {
    let fired = Arc::new(AtomicUsize::new(0));
    let result = AsyncResult::succeeded(5_u8);

    let counter = Arc::clone(&fired);
    result.on_success(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!result.cancel());

    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(result.outcome().is_some_and(|o| o.is_succeeded()));
}
