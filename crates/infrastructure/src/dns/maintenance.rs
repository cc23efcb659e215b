use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{debug, info};
use weftdns_domain::CacheConfig;

use super::cache::ResponseCache;

/// Background purge driver for a [`ResponseCache`].
///
/// The cache only drops expired entries when they are touched; this task
/// walks the expiration index periodically so idle entries are reclaimed too.
pub struct CacheMaintainer {
    cache: Arc<ResponseCache>,
    purge_interval: Duration,
}

impl CacheMaintainer {
    pub fn new(cache: Arc<ResponseCache>, purge_interval_secs: u64) -> Self {
        Self {
            cache,
            purge_interval: Duration::from_secs(purge_interval_secs),
        }
    }

    pub fn from_config(cache: Arc<ResponseCache>, config: &CacheConfig) -> Self {
        Self::new(cache, config.purge_interval_secs)
    }

    /// Start the purge loop.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.purge_interval.as_secs(),
                "cache purge task started"
            );

            loop {
                sleep(self.purge_interval).await;
                let removed = self.cache.purge(Instant::now());
                if removed > 0 {
                    debug!(
                        removed,
                        cache_size = self.cache.len(),
                        "purge cycle completed"
                    );
                }
            }
        })
    }
}
