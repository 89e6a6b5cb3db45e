//! Bounded, multi-producer/multi-consumer job queues backing `index_jobs`,
//! `process_jobs` and `results`.
//!
//! `tokio::sync::mpsc` gives us the bounded multi-producer half for free; the
//! consumer half is wrapped in a mutex so several worker tasks can share one
//! receiver. `put`/`recv` both poll the shared [`Terminate`] flag on a timeout
//! rather than blocking forever, so a worker stuck waiting for space (or for the
//! next job) still notices a shutdown request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

/// Capacity shared by all three pipeline queues.
pub const QUEUE_CAPACITY: usize = 100;

/// How often blocking queue operations re-check [`Terminate`] while waiting.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shared shutdown flag. Cloning is cheap (an `Arc`); every worker, the coordinator
/// and the controller hold a clone and only ever set it once, on the first fatal
/// error or signal.
#[derive(Clone, Default)]
pub struct Terminate(Arc<AtomicBool>);

impl Terminate {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A bounded queue of `T`, writable by many producers and drainable by many
/// consumers.
pub struct Queue<T> {
    sender: mpsc::Sender<T>,
    receiver: Mutex<mpsc::Receiver<T>>,
}

impl<T> Queue<T> {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, receiver) = mpsc::channel(capacity);
        Arc::new(Self { sender, receiver: Mutex::new(receiver) })
    }

    /// Enqueue `item`, waiting for space if the queue is full. Returns `false`
    /// without enqueuing if `terminate` fires first.
    pub async fn put(&self, item: T, terminate: &Terminate) -> bool {
        let mut item = Some(item);
        loop {
            if terminate.is_set() {
                return false;
            }
            match tokio::time::timeout(POLL_INTERVAL, self.sender.reserve()).await {
                Ok(Ok(permit)) => {
                    permit.send(item.take().expect("item consumed exactly once"));
                    return true;
                }
                Ok(Err(_)) => return false, // every receiver dropped
                Err(_) => continue,         // timed out, re-check terminate
            }
        }
    }

    /// Dequeue the next item, or `None` if `terminate` fires (or every sender has
    /// dropped) before one arrives.
    pub async fn get(&self, terminate: &Terminate) -> Option<T> {
        loop {
            if terminate.is_set() {
                return None;
            }
            let mut receiver = self.receiver.lock().await;
            match tokio::time::timeout(POLL_INTERVAL, receiver.recv()).await {
                Ok(Some(item)) => return Some(item),
                Ok(None) => return None,
                Err(_) => continue,
            }
        }
    }

    /// Non-blocking variant used by the coordinator's reorder loop: a single poll
    /// with a fixed timeout, no terminate re-check (the caller re-checks its own
    /// termination condition every 20 iterations).
    pub async fn get_timeout(&self, timeout: Duration) -> Option<T> {
        let mut receiver = self.receiver.lock().await;
        tokio::time::timeout(timeout, receiver.recv()).await.ok().flatten()
    }

    /// True once every in-flight producer has returned and the buffered items have
    /// all been drained.
    pub fn is_closed_and_empty(&self) -> bool {
        self.sender.is_closed() && self.sender.capacity() == self.sender.max_capacity()
    }
}
