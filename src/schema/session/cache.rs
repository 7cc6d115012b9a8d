//! Session info caching and parsing

use std::sync::Arc;

use super::SessionInfo;
use crate::Result;
use crate::yaml_utils::{extract_yaml, preprocess_iracing_yaml};
use tracing::debug;

/// Session info cache entry with version tracking
#[derive(Debug, Clone)]
pub struct SessionInfoCache {
    /// Cached session info
    pub session_info: Arc<SessionInfo>,
    /// Data-version counter when this was cached
    pub version: i32,
}

impl SessionInfoCache {
    pub fn new(session_info: Arc<SessionInfo>, version: i32) -> Self {
        Self { session_info, version }
    }

    /// Check if cache is valid for given version
    pub fn is_valid(&self, current_version: i32) -> bool {
        self.version == current_version
    }
}

/// Session info parser with a version-keyed cache.
///
/// The YAML block is only re-parsed when the data-version counter differs
/// from the one the cached copy was parsed at.
#[derive(Debug, Clone, Default)]
pub struct SessionInfoParser {
    cache: Option<SessionInfoCache>,
}

impl SessionInfoParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the session block read from the region, reusing the cached copy
    /// when `version` has not changed.
    pub fn parse_block(&mut self, block: &[u8], version: i32) -> Result<Arc<SessionInfo>> {
        if let Some(cached) = self.get_cached(version) {
            debug!(version, "Using cached session info");
            return Ok(cached);
        }

        debug!(version, length = block.len(), "Parsing fresh session info");
        let session_info = Arc::new(Self::parse(&extract_yaml(block)?)?);
        self.cache = Some(SessionInfoCache::new(Arc::clone(&session_info), version));
        Ok(session_info)
    }

    /// Parse raw iRacing YAML, repairing it first.
    pub fn parse(yaml: &str) -> Result<SessionInfo> {
        SessionInfo::parse(&preprocess_iracing_yaml(yaml)?)
    }

    /// Get cached session info if valid for version
    pub fn get_cached(&self, version: i32) -> Option<Arc<SessionInfo>> {
        self.cache
            .as_ref()
            .filter(|cache| cache.is_valid(version))
            .map(|cache| Arc::clone(&cache.session_info))
    }

    /// Version the cached copy was parsed at, if any.
    pub fn cached_version(&self) -> Option<i32> {
        self.cache.as_ref().map(|cache| cache.version)
    }

    /// Drop the cached copy; the next parse always reads the block.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }
}
