//! Per-provider request spacing.
//!
//! [`RateLimited`] wraps any provider, enforces its minimum interval between
//! calls, and lets settings override its priority, enabled flag and
//! interval without touching the provider itself.

use std::sync::Arc;

use async_trait::async_trait;
use gamevault_catalog::GameMetadata;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::ProviderError;
use crate::provider::MetadataProvider;

/// Serializes callers so that consecutive calls are at least `interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call is allowed, then record it.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// A provider whose calls go through a [`RateLimiter`].
pub struct RateLimited {
    inner: Arc<dyn MetadataProvider>,
    priority: i32,
    enabled: bool,
    limiter: RateLimiter,
}

impl RateLimited {
    /// Wrap `inner` using its own priority, enabled flag and interval.
    pub fn new(inner: Arc<dyn MetadataProvider>) -> Self {
        Self {
            priority: inner.priority(),
            enabled: inner.enabled(),
            limiter: RateLimiter::new(inner.request_interval()),
            inner,
        }
    }

    /// Replace whichever properties are `Some`.
    pub fn with_overrides(
        mut self,
        enabled: Option<bool>,
        priority: Option<i32>,
        interval: Option<Duration>,
    ) -> Self {
        if let Some(enabled) = enabled {
            self.enabled = enabled;
        }
        if let Some(priority) = priority {
            self.priority = priority;
        }
        if let Some(interval) = interval {
            self.limiter = RateLimiter::new(interval);
        }
        self
    }
}

#[async_trait]
impl MetadataProvider for RateLimited {
    fn slug(&self) -> &str {
        self.inner.slug()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn request_interval(&self) -> Duration {
        self.limiter.interval()
    }

    async fn search(&self, query: &str) -> Result<Vec<GameMetadata>, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::Disabled);
        }
        self.limiter.wait().await;
        self.inner.search(query).await
    }

    async fn fetch_by_id(&self, provider_data_id: &str) -> Result<GameMetadata, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::Disabled);
        }
        self.limiter.wait().await;
        self.inner.fetch_by_id(provider_data_id).await
    }
}
