//! Session Guard - banner probe
//!
//! Reads the identification line of each configured TCP target under
//! read/write deadlines and keeps the results in a bounded LRU cache.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_guard::{BannerProbe, BoundedCache, Config};

/// Main entry point for the banner probe.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the banner cache with an eviction logger
/// 4. Probe all targets, stopping early on SIGINT/SIGTERM
/// 5. Print a JSON report with banners and cache statistics
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_guard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting session_guard banner probe");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_capacity={}, read_timeout={}ms, write_timeout={}ms, targets={}",
        config.cache_capacity,
        config.read_timeout_ms,
        config.write_timeout_ms,
        config.probe_targets.len()
    );
    if config.probe_targets.is_empty() {
        warn!("PROBE_TARGETS is empty, nothing to probe");
    }

    let cache = Arc::new(BoundedCache::with_evict(
        config.cache_capacity,
        |target: String, banner: String| {
            info!(%target, %banner, "banner evicted from cache");
        },
    ));
    let probe = Arc::new(BannerProbe::from_config(&config, Arc::clone(&cache)));

    let reports = tokio::select! {
        reports = probe.run(&config.probe_targets) => reports,
        _ = shutdown_signal() => {
            warn!("Interrupted, abandoning remaining probes");
            return Ok(());
        }
    };

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    info!("Probed {} targets, {} failed", reports.len(), failed);

    let output = serde_json::json!({
        "reports": reports,
        "cache": cache.stats(),
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to encode report")?
    );

    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
