//! The serial actor primitive: owned state, a private work queue, and one
//! task that runs submissions to completion, one at a time.
//!
//! The game loop, the chunk manager and every loaded chunk all present this
//! contract, so the pattern lives here once. Ordering guarantee: two
//! submissions from the same task run in submission order; nothing is
//! promised across different submitters.

use log::error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub type Work<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

enum Msg<S> {
    Work(Work<S>),
    Stop,
}

/// The actor has stopped and rejected the submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stopped;

/// Cloneable submission handle to one actor.
pub struct Handle<S> {
    tx: mpsc::UnboundedSender<Msg<S>>,
    accepting: Arc<AtomicBool>,
    name: Arc<str>,
}

impl<S> Clone for Handle<S> {
    fn clone(&self) -> Self {
        Handle {
            tx: self.tx.clone(),
            accepting: self.accepting.clone(),
            name: self.name.clone(),
        }
    }
}

impl<S> Handle<S> {
    /// Enqueues a work item to run alone against the actor's state.
    pub fn submit(&self, work: impl FnOnce(&mut S) + Send + 'static) -> Result<(), Stopped> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(Stopped);
        }
        self.tx.send(Msg::Work(Box::new(work))).map_err(|_| Stopped)
    }

    /// Submits a work item and waits for its return value.
    pub async fn query<R, F>(&self, f: F) -> Result<R, Stopped>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(move |state| {
            let _ = reply_tx.send(f(state));
        })?;
        reply_rx.await.map_err(|_| Stopped)
    }

    /// Stops accepting work. Everything already queued still runs before the
    /// actor's task exits.
    pub fn stop(&self) {
        self.accepting.store(false, Ordering::Release);
        let _ = self.tx.send(Msg::Stop);
    }

    pub fn is_stopped(&self) -> bool {
        !self.accepting.load(Ordering::Acquire)
    }
}

/// Starts an actor over `state` and returns its handle. The name only shows
/// up in logs.
pub fn spawn<S: Send + 'static>(name: &str, state: S) -> Handle<S> {
    let (tx, rx) = mpsc::unbounded_channel();
    let accepting = Arc::new(AtomicBool::new(true));
    let handle = Handle {
        tx,
        accepting: accepting.clone(),
        name: name.into(),
    };
    let task_name = handle.name.clone();
    tokio::spawn(run(task_name, state, rx, accepting));
    handle
}

async fn run<S>(
    name: Arc<str>,
    mut state: S,
    mut rx: mpsc::UnboundedReceiver<Msg<S>>,
    accepting: Arc<AtomicBool>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            Msg::Work(work) => run_one(&name, &mut state, work),
            Msg::Stop => break,
        }
    }
    accepting.store(false, Ordering::Release);
    // submissions that raced the stop still get their turn
    while let Ok(msg) = rx.try_recv() {
        if let Msg::Work(work) = msg {
            run_one(&name, &mut state, work);
        }
    }
}

fn run_one<S>(name: &str, state: &mut S, work: Work<S>) {
    // a bad work item must not take the actor with it
    if catch_unwind(AssertUnwindSafe(|| work(state))).is_err() {
        error!("work item submitted to '{}' panicked, dropping it", name);
    }
}
