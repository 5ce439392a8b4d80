//! Banner Probe
//!
//! Connects to TCP services, reads the identification line they send first
//! (an SSH server's `SSH-2.0-...` banner, for instance) and caches it.
//!
//! Every network step is bounded: connecting and reading the whole banner
//! line each use the read deadline, writing the optional greeting uses the
//! write deadline.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cache::BoundedCache;
use crate::channel::{within, DeadlineChannel};
use crate::config::Config;
use crate::error::{ChannelError, ProbeError};

/// Longest identification line accepted, excluding the line terminator.
pub const MAX_BANNER_LEN: usize = 255;

/// Cache of `host:port` to banner line.
pub type BannerCache = BoundedCache<String, String>;

// == Probe Report ==
/// Outcome of probing one target.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeReport {
    fn new(target: &str, outcome: Result<String, String>) -> Self {
        let (banner, error) = match outcome {
            Ok(banner) => (Some(banner), None),
            Err(error) => (None, Some(error)),
        };
        Self {
            target: target.to_string(),
            banner,
            error,
        }
    }
}

// == Banner Probe ==
pub struct BannerProbe {
    cache: Arc<BannerCache>,
    read_timeout: Duration,
    write_timeout: Duration,
    greeting: Option<Vec<u8>>,
}

impl BannerProbe {
    pub fn new(cache: Arc<BannerCache>, read_timeout: Duration, write_timeout: Duration) -> Self {
        Self {
            cache,
            read_timeout,
            write_timeout,
            greeting: None,
        }
    }

    /// Builds a probe with the deadlines and greeting from `config`.
    pub fn from_config(config: &Config, cache: Arc<BannerCache>) -> Self {
        let probe = Self::new(cache, config.read_timeout(), config.write_timeout());
        match &config.probe_greeting {
            Some(greeting) => probe.with_greeting(greeting),
            None => probe,
        }
    }

    /// Sends `line`, CRLF-terminated, after each banner is read.
    pub fn with_greeting(mut self, line: impl AsRef<str>) -> Self {
        let mut bytes = line.as_ref().trim_end().as_bytes().to_vec();
        bytes.extend_from_slice(b"\r\n");
        self.greeting = Some(bytes);
        self
    }

    pub fn cache(&self) -> &Arc<BannerCache> {
        &self.cache
    }

    // == Probe ==
    /// Returns the banner for `target`, from the cache when present.
    pub async fn probe(&self, target: &str) -> Result<String, ProbeError> {
        if let Some(banner) = self.cache.get(target) {
            debug!(target, "banner served from cache");
            return Ok(banner);
        }

        let stream = match within(self.read_timeout, TcpStream::connect(target)).await {
            Some(Ok(stream)) => stream,
            Some(Err(source)) => {
                return Err(ProbeError::Connect {
                    target: target.to_string(),
                    source,
                })
            }
            None => return Err(ProbeError::ConnectTimeout(target.to_string())),
        };

        let mut chan = DeadlineChannel::with_timeouts(stream, self.read_timeout, self.write_timeout);
        let banner = read_banner(&mut chan).await?;
        if let Some(greeting) = &self.greeting {
            write_all(&mut chan, greeting).await?;
        }
        if let Err(e) = chan.shutdown().await {
            debug!(target, error = %e, "shutdown after probe failed");
        }

        info!(target, %banner, "banner captured");
        self.cache.add(target.to_string(), banner.clone());
        Ok(banner)
    }

    // == Run ==
    /// Probes every target concurrently, returning reports in input order.
    pub async fn run(self: &Arc<Self>, targets: &[String]) -> Vec<ProbeReport> {
        let handles: Vec<_> = targets
            .iter()
            .cloned()
            .map(|target| {
                let probe = Arc::clone(self);
                tokio::spawn(async move {
                    let outcome = probe.probe(&target).await.map_err(|e| {
                        warn!(%target, error = %e, "probe failed");
                        e.to_string()
                    });
                    ProbeReport::new(&target, outcome)
                })
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        for (target, handle) in targets.iter().zip(handles) {
            let report = handle
                .await
                .unwrap_or_else(|e| ProbeReport::new(target, Err(format!("probe task failed: {e}"))));
            reports.push(report);
        }
        reports
    }
}

/// Reads one line, byte by byte so nothing after the newline is consumed.
///
/// The whole line must arrive within the channel's read deadline, so a peer
/// trickling bytes cannot stretch the wait. A trailing `\r` is stripped and
/// does not count toward [`MAX_BANNER_LEN`]; invalid UTF-8 is replaced.
pub async fn read_banner<S>(chan: &mut DeadlineChannel<S>) -> Result<String, ProbeError>
where
    S: AsyncRead + Unpin,
{
    let deadline = chan.read_timeout;
    match within(deadline, read_line(chan)).await {
        Some(line) => line,
        None => Err(ChannelError::TimeoutRead.into()),
    }
}

async fn read_line<S>(chan: &mut DeadlineChannel<S>) -> Result<String, ProbeError>
where
    S: AsyncRead + Unpin,
{
    let mut line = Vec::with_capacity(64);
    let mut byte = [0u8; 1];

    loop {
        if chan.read(&mut byte).await? == 0 {
            return Err(ProbeError::Closed);
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
        // a pending '\r' may still turn out to be the terminator
        let content = line.len() - usize::from(byte[0] == b'\r');
        if content > MAX_BANNER_LEN {
            return Err(ProbeError::BannerTooLong(MAX_BANNER_LEN));
        }
    }

    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

async fn write_all<S>(chan: &mut DeadlineChannel<S>, mut data: &[u8]) -> Result<(), ProbeError>
where
    S: AsyncWrite + Unpin,
{
    while !data.is_empty() {
        let n = chan.write(data).await?;
        if n == 0 {
            return Err(ChannelError::Io(std::io::ErrorKind::WriteZero.into()).into());
        }
        data = &data[n..];
    }
    chan.flush().await?;
    Ok(())
}
