//! Redis-backed lookup cache adapter.
//!
//! Uses `bb8-redis` for connection pooling and `serde_json` for the cached
//! payloads. Writes apply a small random jitter on top of the requested TTL
//! so a burst of identical lookups does not expire in the same instant.
//! Prefix invalidation walks `SCAN MATCH` cursors rather than `KEYS`, so it
//! stays incremental on a busy instance.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::redis::AsyncCommands;
use bb8_redis::{RedisConnectionManager, bb8, redis};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::domain::lookup_key::LookupCacheKey;
use crate::domain::lookup_service::LookupResponse;
use crate::domain::ports::{LookupCache, LookupCacheError};

/// Upper bound of the random TTL jitter, as a fraction of the TTL.
const JITTER_DENOMINATOR: u64 = 10;
/// Keys examined per `SCAN` iteration during prefix invalidation.
const SCAN_BATCH: usize = 100;

/// Redis-backed implementation of the `LookupCache` port.
#[derive(Clone)]
pub struct RedisLookupCache {
    pool: bb8::Pool<RedisConnectionManager>,
}

impl RedisLookupCache {
    /// Wrap an existing connection pool.
    #[must_use]
    pub fn new(pool: bb8::Pool<RedisConnectionManager>) -> Self {
        Self { pool }
    }

    /// Build a pool for the given Redis URL and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [`LookupCacheError::Backend`] when the URL is invalid or the
    /// pool cannot be constructed.
    pub async fn connect(redis_url: &str) -> Result<Self, LookupCacheError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|error| LookupCacheError::backend(error.to_string()))?;
        let pool = bb8::Pool::builder()
            .build(manager)
            .await
            .map_err(|error| LookupCacheError::backend(error.to_string()))?;
        Ok(Self::new(pool))
    }

    async fn connection(
        &self,
    ) -> Result<bb8::PooledConnection<'_, RedisConnectionManager>, LookupCacheError> {
        self.pool
            .get()
            .await
            .map_err(|error| LookupCacheError::backend(error.to_string()))
    }
}

/// TTL in milliseconds with up to 10% added jitter.
fn jittered_ttl_ms(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    let span = ttl_ms / JITTER_DENOMINATOR;
    if span == 0 {
        return ttl_ms;
    }
    let jitter = SmallRng::from_entropy().gen_range(0..=span);
    ttl_ms.saturating_add(jitter)
}

#[async_trait]
impl LookupCache for RedisLookupCache {
    async fn get(&self, key: &LookupCacheKey) -> Result<Option<LookupResponse>, LookupCacheError> {
        let mut conn = self.connection().await?;

        let raw: Option<String> = conn
            .get(key.as_str())
            .await
            .map_err(|error| LookupCacheError::backend(error.to_string()))?;

        raw.map(|payload| {
            serde_json::from_str(&payload)
                .map_err(|error| LookupCacheError::serialization(error.to_string()))
        })
        .transpose()
    }

    async fn put(
        &self,
        key: &LookupCacheKey,
        response: &LookupResponse,
        ttl: Duration,
    ) -> Result<(), LookupCacheError> {
        let payload = serde_json::to_string(response)
            .map_err(|error| LookupCacheError::serialization(error.to_string()))?;
        let mut conn = self.connection().await?;

        conn.pset_ex::<_, _, ()>(key.as_str(), payload, jittered_ttl_ms(ttl))
            .await
            .map_err(|error| LookupCacheError::backend(error.to_string()))
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), LookupCacheError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{prefix}*");
        let mut cursor: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut *conn)
                .await
                .map_err(|error| LookupCacheError::backend(error.to_string()))?;

            if !keys.is_empty() {
                let _: i64 = conn
                    .del(keys)
                    .await
                    .map_err(|error| LookupCacheError::backend(error.to_string()))?;
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn jitter_stays_within_ten_percent() {
        let ttl = Duration::from_secs(3600);
        for _ in 0..32 {
            let value = jittered_ttl_ms(ttl);
            assert!(value >= 3_600_000);
            assert!(value <= 3_960_000);
        }
    }

    #[rstest]
    fn sub_threshold_ttl_is_left_exact() {
        assert_eq!(jittered_ttl_ms(Duration::from_millis(5)), 5);
    }
}
