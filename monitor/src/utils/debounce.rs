//! Per-key coalescing of bursts of events.
//!
//! A single editor save usually fires several file-system events (truncate,
//! write, metadata, sometimes a rename). Observing each of them would run
//! the diff repeatedly and, on the line-count fallback, credit the same edit
//! more than once. The [`Debouncer`] holds the latest value per key and only
//! emits it once the key has been quiet for the configured interval.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::time::Duration;
//! use tokio::sync::mpsc;
//! use codetrack_monitor::utils::debounce::Debouncer;
//!
//! # async fn example() {
//! let (tx, mut rx) = mpsc::channel(64);
//! let debouncer = Debouncer::new(Duration::from_millis(200), tx);
//!
//! let path = PathBuf::from("/w/src/lib.rs");
//! debouncer.push(path.clone(), 1).await.ok();
//! debouncer.push(path.clone(), 2).await.ok();
//!
//! assert_eq!(rx.recv().await, Some((path, 2)));
//! # }
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Default quiet period before an event is emitted, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

const INPUT_CAPACITY: usize = 1024;

/// Errors from feeding the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DebouncerError {
    /// The background task has stopped.
    #[error("debouncer channel closed")]
    ChannelClosed,

    /// The input queue is full.
    #[error("debouncer queue full")]
    Full,
}

/// Coalesces events by key, emitting the latest value after a quiet period.
///
/// Dropping the debouncer closes its input; the background task then emits
/// whatever is still pending and exits.
#[derive(Debug)]
pub struct Debouncer<K, V> {
    input: mpsc::Sender<(K, V)>,
    _task: JoinHandle<()>,
}

impl<K, V> Debouncer<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Send + 'static,
{
    /// Spawns the debounce task, emitting into `output`.
    #[must_use]
    pub fn new(quiet: Duration, output: mpsc::Sender<(K, V)>) -> Self {
        let (input, rx) = mpsc::channel(INPUT_CAPACITY);
        let task = tokio::spawn(debounce_loop(quiet, rx, output));
        Self { input, _task: task }
    }

    /// Queues an event, replacing any pending value for the same key.
    ///
    /// # Errors
    ///
    /// Returns [`DebouncerError::ChannelClosed`] if the task has stopped.
    pub async fn push(&self, key: K, value: V) -> Result<(), DebouncerError> {
        self.input
            .send((key, value))
            .await
            .map_err(|_| DebouncerError::ChannelClosed)
    }

    /// Queues an event without waiting, for use from synchronous callbacks.
    ///
    /// # Errors
    ///
    /// Returns [`DebouncerError::Full`] or [`DebouncerError::ChannelClosed`].
    pub fn try_push(&self, key: K, value: V) -> Result<(), DebouncerError> {
        self.input.try_send((key, value)).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DebouncerError::Full,
            mpsc::error::TrySendError::Closed(_) => DebouncerError::ChannelClosed,
        })
    }
}

struct Pending<V> {
    value: V,
    due: Instant,
}

async fn debounce_loop<K, V>(
    quiet: Duration,
    mut input: mpsc::Receiver<(K, V)>,
    output: mpsc::Sender<(K, V)>,
) where
    K: Clone + Eq + Hash + Debug,
{
    let mut pending: HashMap<K, Pending<V>> = HashMap::new();
    debug!(quiet_ms = quiet.as_millis(), "Debouncer started");

    loop {
        let next_due = pending.values().map(|p| p.due).min();

        tokio::select! {
            received = input.recv() => match received {
                Some((key, value)) => {
                    trace!(key = ?key, "Event deferred");
                    pending.insert(key, Pending { value, due: Instant::now() + quiet });
                }
                None => break,
            },
            () = sleep_until_due(next_due) => {
                let now = Instant::now();
                let ready: Vec<K> = pending
                    .iter()
                    .filter(|(_, p)| p.due <= now)
                    .map(|(k, _)| k.clone())
                    .collect();
                for key in ready {
                    if let Some(p) = pending.remove(&key) {
                        emit(&output, key, p.value).await;
                    }
                }
            }
        }
    }

    for (key, p) in pending.drain() {
        emit(&output, key, p.value).await;
    }
    debug!("Debouncer stopped");
}

async fn sleep_until_due(due: Option<Instant>) {
    match due {
        Some(due) => tokio::time::sleep_until(due).await,
        None => std::future::pending().await,
    }
}

async fn emit<K: Debug, V>(output: &mpsc::Sender<(K, V)>, key: K, value: V) {
    trace!(key = ?key, "Event released");
    if output.send((key, value)).await.is_err() {
        warn!("Debounced event dropped, receiver closed");
    }
}
