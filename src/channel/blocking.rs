//! Blocking Deadline Channel
//!
//! Bounds reads and writes on a blocking stream by running each call on
//! tokio's blocking pool and racing it against a timer.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;
use tracing::debug;

use crate::channel::{within, DuplexStream};
use crate::error::{ChannelError, Result};

/// Default cap on workers alive at once, abandoned ones included.
pub const DEFAULT_MAX_WORKERS: usize = 32;

// == Blocking Deadline Channel ==
/// Wraps a blocking duplex stream so that no single read or write keeps the
/// caller waiting longer than its configured timeout.
///
/// Blocking calls cannot be cancelled. When a deadline elapses the worker
/// is abandoned and keeps running until the stream returns; its result is
/// discarded. Workers only ever touch their own copy of the data, so the
/// caller's buffer is never written after a timeout, but an abandoned read
/// may still consume bytes from the stream.
///
/// At most `max_workers` calls hold a worker at once. A call that cannot
/// get one before its deadline fails with the same timeout error, so a
/// peer that never answers pins a fixed number of pool threads rather than
/// one per call. [`in_flight`](Self::in_flight) reports how many are held.
///
/// A zero timeout means no deadline; the call still runs on the pool.
pub struct BlockingDeadlineChannel<S> {
    stream: Arc<S>,
    /// Longest a single `read` may wait (zero = no deadline)
    pub read_timeout: Duration,
    /// Longest a single `write` may wait (zero = no deadline)
    pub write_timeout: Duration,
    max_workers: usize,
    workers: Arc<Semaphore>,
}

impl<S: DuplexStream> BlockingDeadlineChannel<S> {
    // == Constructors ==
    /// Wraps `stream` with no deadlines set.
    pub fn new(stream: S) -> Self {
        Self::with_timeouts(stream, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_timeouts(stream: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self::from_shared(Arc::new(stream), read_timeout, write_timeout)
    }

    /// Wraps a stream the caller keeps a handle to, e.g. to close it later.
    pub fn from_shared(stream: Arc<S>, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
            write_timeout,
            max_workers: DEFAULT_MAX_WORKERS,
            workers: Arc::new(Semaphore::new(DEFAULT_MAX_WORKERS)),
        }
    }

    /// Sets the cap on concurrently held workers (minimum 1).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        self.max_workers = max_workers;
        self.workers = Arc::new(Semaphore::new(max_workers));
        self
    }

    // == Read ==
    /// Reads into `buf`, failing with [`ChannelError::TimeoutRead`] if the
    /// stream produces nothing within `read_timeout`.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let len = buf.len();
        let stream = Arc::clone(&self.stream);
        let outcome = self
            .race("read", self.read_timeout, move || {
                let mut scratch = vec![0u8; len];
                let n = stream.read(&mut scratch)?;
                scratch.truncate(n);
                Ok(scratch)
            })
            .await;

        match outcome {
            Some(Ok(data)) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Some(Err(e)) => Err(e.into()),
            None => Err(ChannelError::TimeoutRead),
        }
    }

    // == Write ==
    /// Writes from `buf`, failing with [`ChannelError::TimeoutWrite`] if the
    /// stream accepts nothing within `write_timeout`.
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        let data = buf.to_vec();
        let stream = Arc::clone(&self.stream);
        match self.race("write", self.write_timeout, move || stream.write(&data)).await {
            Some(result) => Ok(result?),
            None => Err(ChannelError::TimeoutWrite),
        }
    }

    // == Close ==
    /// Closes the underlying stream. Abandoned workers blocked on it
    /// usually return once it is closed, which frees their slots.
    pub fn close(&self) -> Result<()> {
        Ok(self.stream.close()?)
    }

    // == Accessors ==
    /// Returns a shared handle to the wrapped stream.
    pub fn stream(&self) -> Arc<S> {
        Arc::clone(&self.stream)
    }

    /// Number of workers currently held, including any whose caller
    /// already gave up on them.
    pub fn in_flight(&self) -> usize {
        self.max_workers - self.workers.available_permits()
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Runs `op` on the blocking pool and waits at most `timeout` for a
    /// worker slot and the result together.
    ///
    /// The slot is released when `op` returns, before the result is
    /// delivered, so a finished call never counts as in flight.
    async fn race<T, F>(&self, direction: &'static str, timeout: Duration, op: F) -> Option<io::Result<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> io::Result<T> + Send + 'static,
    {
        let workers = Arc::clone(&self.workers);
        let call = async move {
            let permit = workers
                .acquire_owned()
                .await
                .map_err(|e| io::Error::other(format!("{direction} worker pool closed: {e}")))?;
            spawn_blocking(move || {
                let result = op();
                drop(permit);
                result
            })
            .await
            .map_err(|e| io::Error::other(format!("{direction} worker failed: {e}")))?
        };

        let outcome = within(timeout, call).await;
        if outcome.is_none() {
            debug!(direction, ?timeout, in_flight = self.in_flight(), "deadline elapsed, abandoning worker");
        }
        outcome
    }
}

impl<S> std::fmt::Debug for BlockingDeadlineChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingDeadlineChannel")
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("max_workers", &self.max_workers)
            .field("in_flight", &(self.max_workers - self.workers.available_permits()))
            .finish()
    }
}
