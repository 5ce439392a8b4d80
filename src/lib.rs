//! Session Guard - resource-safety primitives for network session code
//!
//! Provides a concurrency-safe LRU cache with an eviction callback and
//! duplex channels whose reads and writes fail after a fixed deadline.

pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod probe;

pub use cache::{BoundedCache, CacheStats};
pub use channel::{BlockingDeadlineChannel, DeadlineChannel, DuplexStream};
pub use config::Config;
pub use error::{ChannelError, ProbeError};
pub use probe::BannerProbe;
