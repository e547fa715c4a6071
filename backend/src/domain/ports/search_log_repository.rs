//! Port for the append-only search log and its analytics queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::search_analytics::{
    AnalyticsWindow, LoggedSearch, SearchRecord, TopSearch, TypeCount,
};

/// Errors raised by search-log repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchLogRepositoryError {
    /// Repository connection could not be established.
    #[error("search log connection failed: {message}")]
    Connection { message: String },
    /// Query or insert failed during execution.
    #[error("search log query failed: {message}")]
    Query { message: String },
}

impl SearchLogRepositoryError {
    /// Create a connection error with the given message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a query error with the given message.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Port for search-log persistence and aggregation.
///
/// Appends are fire-and-forget at the call site: the lookup service spawns
/// them unawaited and swallows failures, so adapters never need to retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchLogRepository: Send + Sync {
    /// Append one search record.
    async fn append(&self, record: SearchRecord) -> Result<(), SearchLogRepositoryError>;

    /// Count searches in the window, optionally filtered by outcome.
    async fn count_searches(
        &self,
        window: AnalyticsWindow,
        result_found: Option<bool>,
    ) -> Result<i64, SearchLogRepositoryError>;

    /// Per-query-type counts in the window.
    async fn counts_by_type(
        &self,
        window: AnalyticsWindow,
    ) -> Result<Vec<TypeCount>, SearchLogRepositoryError>;

    /// Most recent searches in the window, newest first.
    async fn recent_searches(
        &self,
        window: AnalyticsWindow,
        limit: i64,
    ) -> Result<Vec<LoggedSearch>, SearchLogRepositoryError>;

    /// Most frequent (query, type, outcome) groups since `since`.
    async fn top_searches(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TopSearch>, SearchLogRepositoryError>;
}

/// Fixture sink that discards appends and reports an empty log.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSearchLogRepository;

#[async_trait]
impl SearchLogRepository for FixtureSearchLogRepository {
    async fn append(&self, _record: SearchRecord) -> Result<(), SearchLogRepositoryError> {
        Ok(())
    }

    async fn count_searches(
        &self,
        _window: AnalyticsWindow,
        _result_found: Option<bool>,
    ) -> Result<i64, SearchLogRepositoryError> {
        Ok(0)
    }

    async fn counts_by_type(
        &self,
        _window: AnalyticsWindow,
    ) -> Result<Vec<TypeCount>, SearchLogRepositoryError> {
        Ok(Vec::new())
    }

    async fn recent_searches(
        &self,
        _window: AnalyticsWindow,
        _limit: i64,
    ) -> Result<Vec<LoggedSearch>, SearchLogRepositoryError> {
        Ok(Vec::new())
    }

    async fn top_searches(
        &self,
        _since: DateTime<Utc>,
        _limit: i64,
    ) -> Result<Vec<TopSearch>, SearchLogRepositoryError> {
        Ok(Vec::new())
    }
}
