// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use anyspawn::Spawner;
use futures::executor::block_on;
use stratum_result::{CompletionContext, panic_message};

type Task<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Runs tasks against a piece of state on one dedicated thread, in submission order.
///
/// The state never leaves the worker thread, so tasks observe each other's effects without any
/// locking. Submitting never blocks. A panicking task is logged and the worker moves on to the
/// next one.
///
/// Dropping the queue closes the channel and waits for the tasks already submitted, unless the
/// drop happens on the worker thread itself.
#[derive(Debug)]
pub(crate) struct ConfinementQueue<S> {
    // Set to `None` on drop to release the channel before joining.
    sender: Option<mpsc::Sender<Task<S>>>,
    worker: Option<JoinHandle<()>>,
}

impl<S> ConfinementQueue<S>
where
    S: Send + 'static,
{
    pub(crate) fn start(name: String, state: S) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::Builder::new()
            .name(name)
            .spawn(move || worker_entrypoint(state, &receiver))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Enqueues `task`. Returns `false` if the worker is gone and the task was dropped.
    pub(crate) fn submit(&self, task: impl FnOnce(&mut S) + Send + 'static) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };

        if sender.send(Box::new(task)).is_err() {
            tracing::error!("disk cache worker has stopped, task dropped");
            return false;
        }

        true
    }
}

impl<S> Drop for ConfinementQueue<S> {
    fn drop(&mut self) {
        drop(self.sender.take());

        let Some(worker) = self.worker.take() else {
            return;
        };

        // The last handle can be released by a callback running on the worker.
        if worker.thread().id() == thread::current().id() {
            return;
        }

        if worker.join().is_err() {
            tracing::error!("disk cache worker terminated abnormally");
        }
    }
}

/// Starts a thread that only runs result callbacks and returns a context that targets it.
///
/// The thread stops once the last clone of the context is dropped.
pub(crate) fn delivery_context(name: String) -> io::Result<CompletionContext> {
    let queue = Arc::new(ConfinementQueue::start(name, ())?);
    let spawner = Spawner::new_custom("stratum_disk_delivery", move |task| {
        queue.submit(move |_: &mut ()| block_on(task));
    });

    Ok(CompletionContext::spawner(spawner))
}

fn worker_entrypoint<S>(mut state: S, receiver: &mpsc::Receiver<Task<S>>) {
    for task in receiver {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| task(&mut state))) {
            tracing::error!(panic = panic_message(payload.as_ref()), "disk cache task panicked");
        }
    }
}
