//! Channel Module
//!
//! Deadline-bounded wrappers around duplex byte streams.
//!
//! # Variants
//! - [`DeadlineChannel`]: async streams (tokio); a timeout drops the pending
//!   I/O future, cancelling it
//! - [`BlockingDeadlineChannel`]: blocking streams driven from async code;
//!   a timeout abandons the pool worker, which runs until the stream returns

mod blocking;
mod deadline;

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

pub use blocking::BlockingDeadlineChannel;
pub use deadline::DeadlineChannel;

pub(crate) use deadline::within;

// == Duplex Stream ==
/// A blocking byte stream that can be read and written through a shared
/// reference, so one thread may read while another writes.
pub trait DuplexStream: Send + Sync + 'static {
    /// Reads into `buf`, blocking until data, EOF or an error.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes from `buf`, blocking until some bytes are accepted.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Closes the stream. Streams without a close step keep the default.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

impl DuplexStream for TcpStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = self;
        Read::read(&mut stream, buf)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut stream = self;
        Write::write(&mut stream, buf)
    }

    fn close(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}
