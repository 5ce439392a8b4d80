//! Error types for deadline channels and the banner probe
//!
//! Provides unified error handling using thiserror.

use std::io;

use thiserror::Error;

// == Channel Error Enum ==
/// Failure of a single read or write on a deadline channel.
///
/// Timeouts are direction-specific and never produced by the wrapped stream,
/// so callers can tell "the peer is slow" apart from "the stream broke".
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The read deadline elapsed before the stream produced data
    #[error("timeout read")]
    TimeoutRead,

    /// The write deadline elapsed before the stream accepted data
    #[error("timeout write")]
    TimeoutWrite,

    /// Error reported by the wrapped stream, passed through untouched
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Returns true for either timeout variant.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::TimeoutRead | ChannelError::TimeoutWrite)
    }
}

// == io::Error Conversion ==
impl From<ChannelError> for io::Error {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Io(inner) => inner,
            timeout => io::Error::new(io::ErrorKind::TimedOut, timeout),
        }
    }
}

// == Probe Error Enum ==
/// Reasons a banner probe can fail.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// TCP connect failed
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    /// TCP connect did not finish within the deadline
    #[error("connect to {0} timed out")]
    ConnectTimeout(String),

    /// Reading the banner or writing the greeting failed
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Peer closed the connection before sending a full line
    #[error("connection closed before banner line was complete")]
    Closed,

    /// Peer sent more than the allowed line length without a newline
    #[error("banner exceeds {0} bytes")]
    BannerTooLong(usize),
}

// == Result Type Alias ==
/// Convenience Result type for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
