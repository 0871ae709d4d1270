//! Time-based eviction of cache entries.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{cache::CacheStore, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictorConfig {
    /// Time between sweeps.
    pub clean_interval: Duration,
    /// Entries whose send date is this old (or older) are removed.
    pub keep_duration: Duration,
}

impl Default for EvictorConfig {
    fn default() -> Self {
        Self {
            clean_interval: Duration::from_secs(10 * 60),
            keep_duration: Duration::from_secs(48 * 3600),
        }
    }
}

/// Periodic sweeper for the message cache.
///
/// `run` owns the ticking loop; `sweep` and `sweep_at` perform a single pass and can
/// be called independently (admin use, tests).
pub struct CacheEvictor {
    store: Arc<dyn CacheStore>,
    cfg: EvictorConfig,
}

impl CacheEvictor {
    pub fn new(store: Arc<dyn CacheStore>, cfg: EvictorConfig) -> Self {
        Self { store, cfg }
    }

    pub async fn sweep(&self) -> Result<()> {
        self.sweep_at(Utc::now().timestamp()).await
    }

    /// Delete every entry dated at or before `now - keep_duration`.
    pub async fn sweep_at(&self, now: i64) -> Result<()> {
        let keep = i64::try_from(self.cfg.keep_duration.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(keep);
        debug!(cutoff_unix = cutoff, "running cache cleanup");

        let deleted = self.store.delete_dated_up_to(cutoff).await?;
        info!(deleted, cutoff_unix = cutoff, "cache cleanup completed");
        Ok(())
    }

    /// Sweep immediately, then once per interval until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            clean_interval = ?self.cfg.clean_interval,
            keep_duration = ?self.cfg.keep_duration,
            "starting cache cleaner"
        );

        // `interval` panics on a zero period.
        let period = self.cfg.clean_interval.max(Duration::from_millis(1));
        let mut tick = tokio::time::interval(period);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("stopping cache cleaner");
                    break;
                }
                _ = tick.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "cache cleanup failed");
                    }
                }
            }
        }
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
