use crate::cache::ContentCache;
use crate::error::ContentError;
use crate::upstream::UpstreamClient;
use crate::versions::VersionMap;
use std::sync::Arc;
use std::time::Duration;

const VERSIONS_CACHE_KEY: &str = "versions";

/// Turns the upstream tag list into a cached [`VersionMap`].
pub struct VersionResolver {
    upstream: Arc<UpstreamClient>,
    cache: ContentCache<&'static str, Arc<VersionMap>>,
    hide_alpha: bool,
}

impl VersionResolver {
    pub fn new(upstream: Arc<UpstreamClient>, capacity: usize, ttl: Duration, hide_alpha: bool) -> Self {
        Self {
            upstream,
            cache: ContentCache::new(capacity, ttl),
            hide_alpha,
        }
    }

    /// Current version map, from cache when fresh.
    ///
    /// A failed tag-list call is returned as-is and never cached. Concurrent
    /// misses may both hit upstream; the later store wins.
    pub async fn resolve(&self) -> Result<Arc<VersionMap>, ContentError> {
        if let Some(map) = self.cache.get(&VERSIONS_CACHE_KEY) {
            tracing::trace!(versions = map.len(), "Version list cache HIT");
            return Ok(map);
        }

        tracing::debug!("Version list cache MISS, fetching tags");
        let result = self.upstream.fetch_version_tags().await;
        if !result.is_success() {
            tracing::warn!(status = %result.status, "Upstream tag list request failed");
            return Err(ContentError::Upstream {
                status: result.status,
                body: result.body_text(),
            });
        }

        let map = VersionMap::parse(&result.body, self.hide_alpha).map_err(|e| {
            ContentError::Unexpected(format!("Failed to parse upstream tag list: {}", e))
        })?;
        tracing::debug!(
            versions = map.len(),
            hide_alpha = self.hide_alpha,
            "Resolved version list"
        );

        let map = Arc::new(map);
        self.cache.set(VERSIONS_CACHE_KEY, map.clone());
        Ok(map)
    }

    /// Drop the cached version list so the next call refetches.
    pub fn invalidate(&self) {
        self.cache.clear();
    }
}
