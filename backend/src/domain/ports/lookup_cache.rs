//! Port interface for caching resolved lookup responses.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::lookup_key::LookupCacheKey;
use crate::domain::lookup_service::LookupResponse;

/// Errors surfaced by the caching adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupCacheError {
    /// Cache backend is unavailable or timing out.
    #[error("lookup cache backend failure: {message}")]
    Backend { message: String },
    /// Serialisation or deserialisation of cached content failed.
    #[error("lookup cache serialisation failed: {message}")]
    Serialization { message: String },
}

impl LookupCacheError {
    /// Create a backend error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Create a serialisation error with the given message.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Port for the lookup response cache.
///
/// Entries are logically independent per key; there are no cross-key
/// transactions. Invalidation is by per-axis key prefix so a mapping
/// mutation can drop every variant qualifier at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Read a cached response for the given key.
    async fn get(&self, key: &LookupCacheKey) -> Result<Option<LookupResponse>, LookupCacheError>;

    /// Store a response under the supplied key with the given time-to-live.
    async fn put(
        &self,
        key: &LookupCacheKey,
        response: &LookupResponse,
        ttl: Duration,
    ) -> Result<(), LookupCacheError>;

    /// Delete every entry whose key starts with `prefix`.
    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), LookupCacheError>;
}

/// Stub cache that always misses, accepts writes silently, and invalidates
/// nothing. Use it where caching behaviour is not under test.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureLookupCache;

#[async_trait]
impl LookupCache for FixtureLookupCache {
    async fn get(&self, _key: &LookupCacheKey) -> Result<Option<LookupResponse>, LookupCacheError> {
        Ok(None)
    }

    async fn put(
        &self,
        _key: &LookupCacheKey,
        _response: &LookupResponse,
        _ttl: Duration,
    ) -> Result<(), LookupCacheError> {
        Ok(())
    }

    async fn invalidate_prefix(&self, _prefix: &str) -> Result<(), LookupCacheError> {
        Ok(())
    }
}
