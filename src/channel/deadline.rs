//! Async Deadline Channel
//!
//! Bounds every read and write on a tokio stream by a per-direction timeout.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{ChannelError, Result};

/// Races `op` against a timer, returning `None` if the timer fires first.
///
/// A zero `timeout` means no deadline. The operation is polled before the
/// timer, so a result that is ready when the deadline lands still wins.
/// Losing the race drops `op`, which cancels it.
pub(crate) async fn within<F: Future>(timeout: Duration, op: F) -> Option<F::Output> {
    if timeout.is_zero() {
        return Some(op.await);
    }

    tokio::select! {
        biased;
        out = op => Some(out),
        _ = tokio::time::sleep(timeout) => None,
    }
}

// == Deadline Channel ==
/// Wraps an async duplex stream so that no single read or write can block
/// longer than its configured timeout.
///
/// `S` may be a borrowed `&mut T`; the wrapper never closes the stream on
/// its own.
///
/// A read or write that times out is cancelled: for cancel-safe streams such
/// as tokio's TCP and duplex streams no bytes are consumed, so a later read
/// still sees them.
#[derive(Debug)]
pub struct DeadlineChannel<S> {
    stream: S,
    /// Longest a single `read` may wait (zero = no deadline)
    pub read_timeout: Duration,
    /// Longest a single `write`, `flush` or `shutdown` may wait (zero = no deadline)
    pub write_timeout: Duration,
}

impl<S> DeadlineChannel<S> {
    // == Constructors ==
    /// Wraps `stream` with no deadlines set.
    pub fn new(stream: S) -> Self {
        Self::with_timeouts(stream, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_timeouts(stream: S, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
            write_timeout,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    // == Accessors ==
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Unwraps the channel, handing the stream back to the caller.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: AsyncRead + Unpin> DeadlineChannel<S> {
    // == Read ==
    /// Reads into `buf`, failing with [`ChannelError::TimeoutRead`] if the
    /// stream produces nothing within `read_timeout`.
    ///
    /// Stream errors are returned unchanged as [`ChannelError::Io`].
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match within(self.read_timeout, self.stream.read(buf)).await {
            Some(result) => Ok(result?),
            None => {
                debug!(timeout = ?self.read_timeout, "read deadline elapsed");
                Err(ChannelError::TimeoutRead)
            }
        }
    }
}

impl<S: AsyncWrite + Unpin> DeadlineChannel<S> {
    // == Write ==
    /// Writes from `buf`, failing with [`ChannelError::TimeoutWrite`] if the
    /// stream accepts nothing within `write_timeout`.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let timeout = self.write_timeout;
        Self::bounded_write(timeout, self.stream.write(buf)).await
    }

    /// Flushes buffered output under the write deadline.
    pub async fn flush(&mut self) -> Result<()> {
        let timeout = self.write_timeout;
        Self::bounded_write(timeout, self.stream.flush()).await
    }

    /// Shuts down the write half under the write deadline.
    pub async fn shutdown(&mut self) -> Result<()> {
        let timeout = self.write_timeout;
        Self::bounded_write(timeout, self.stream.shutdown()).await
    }

    async fn bounded_write<T>(
        timeout: Duration,
        op: impl Future<Output = std::io::Result<T>>,
    ) -> Result<T> {
        match within(timeout, op).await {
            Some(result) => Ok(result?),
            None => {
                debug!(?timeout, "write deadline elapsed");
                Err(ChannelError::TimeoutWrite)
            }
        }
    }
}
