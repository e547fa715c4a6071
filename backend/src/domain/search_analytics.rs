//! Search logging records and analytics aggregation.
//!
//! Every lookup resolution appends a [`SearchRecord`] describing the query
//! and its outcome. Records are append-only; the analytics service reduces
//! them into an overview and a top-searches ranking for the admin surface.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::Error;
use super::ports::{SearchLogRepository, SearchLogRepositoryError};

/// Axis a search query was interpreted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQueryType {
    Code,
    Size,
    Unknown,
}

impl SearchQueryType {
    /// Stable string form persisted to the search log.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Size => "size",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SearchQueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash an IP address before it touches storage; raw addresses are never
/// persisted.
#[must_use]
pub fn hash_ip(ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

/// A search-log entry awaiting persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub query: String,
    pub query_type: SearchQueryType,
    pub result_found: bool,
    pub ip_hash: Option<String>,
}

impl SearchRecord {
    /// Build a record, hashing the caller IP when one is present.
    pub fn new(
        query: impl Into<String>,
        query_type: SearchQueryType,
        result_found: bool,
        client_ip: Option<&str>,
    ) -> Self {
        Self {
            query: query.into(),
            query_type,
            result_found,
            ip_hash: client_ip.map(hash_ip),
        }
    }
}

/// A persisted search-log entry, as listed in recent-search views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedSearch {
    pub query: String,
    pub query_type: SearchQueryType,
    pub result_found: bool,
    pub created_at: DateTime<Utc>,
}

/// Per-type search counts in the analytics overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeCount {
    pub query_type: SearchQueryType,
    pub count: i64,
}

/// Aggregated search statistics over an optional time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total_searches: i64,
    pub successful_searches: i64,
    pub failed_searches: i64,
    /// Percentage with two decimals, e.g. `"66.67%"`.
    pub success_rate: String,
    pub searches_by_type: Vec<TypeCount>,
    pub recent_searches: Vec<LoggedSearch>,
}

/// One entry in the top-searches ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopSearch {
    pub query: String,
    pub query_type: SearchQueryType,
    pub result_found: bool,
    pub count: i64,
}

/// Optional time bounds for analytics queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnalyticsWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Default number of recent searches in the overview.
pub const DEFAULT_RECENT_LIMIT: i64 = 10;
/// Default trailing window for top searches, in days.
pub const DEFAULT_TOP_SEARCH_DAYS: i64 = 7;

/// Read-side analytics over the search log.
#[derive(Clone)]
pub struct AnalyticsService<L> {
    search_log: Arc<L>,
}

impl<L> AnalyticsService<L> {
    /// Create a new service over the given search-log repository.
    pub fn new(search_log: Arc<L>) -> Self {
        Self { search_log }
    }
}

impl<L> AnalyticsService<L>
where
    L: SearchLogRepository,
{
    fn map_log_error(error: SearchLogRepositoryError) -> Error {
        match error {
            SearchLogRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("search log unavailable: {message}"))
            }
            SearchLogRepositoryError::Query { message } => {
                Error::internal(format!("search log query failed: {message}"))
            }
        }
    }

    fn format_success_rate(successful: i64, total: i64) -> String {
        if total <= 0 {
            return "0.00%".to_owned();
        }
        #[expect(
            clippy::cast_precision_loss,
            reason = "search counts stay far below f64 integer precision"
        )]
        let rate = (successful as f64 / total as f64) * 100.0;
        format!("{rate:.2}%")
    }

    /// Aggregate totals, per-type counts, and recent searches.
    ///
    /// # Errors
    ///
    /// Surfaces repository connection and query failures.
    pub async fn overview(
        &self,
        window: AnalyticsWindow,
        recent_limit: Option<i64>,
    ) -> Result<AnalyticsOverview, Error> {
        let limit = recent_limit.unwrap_or(DEFAULT_RECENT_LIMIT);

        let (total, successful, by_type, recent) = tokio::join!(
            self.search_log.count_searches(window, None),
            self.search_log.count_searches(window, Some(true)),
            self.search_log.counts_by_type(window),
            self.search_log.recent_searches(window, limit),
        );

        let total = total.map_err(Self::map_log_error)?;
        let successful = successful.map_err(Self::map_log_error)?;
        let searches_by_type = by_type.map_err(Self::map_log_error)?;
        let recent_searches = recent.map_err(Self::map_log_error)?;

        Ok(AnalyticsOverview {
            total_searches: total,
            successful_searches: successful,
            failed_searches: total - successful,
            success_rate: Self::format_success_rate(successful, total),
            searches_by_type,
            recent_searches,
        })
    }

    /// Most frequent queries over a trailing window of days.
    ///
    /// # Errors
    ///
    /// Surfaces repository connection and query failures.
    pub async fn top_searches(
        &self,
        days: Option<i64>,
        limit: Option<i64>,
    ) -> Result<Vec<TopSearch>, Error> {
        let since = Utc::now() - Duration::days(days.unwrap_or(DEFAULT_TOP_SEARCH_DAYS));
        self.search_log
            .top_searches(since, limit.unwrap_or(DEFAULT_RECENT_LIMIT))
            .await
            .map_err(Self::map_log_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockSearchLogRepository;
    use rstest::rstest;

    #[rstest]
    fn hash_ip_is_deterministic_hex() {
        let first = hash_ip("203.0.113.7");
        let second = hash_ip("203.0.113.7");

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, hash_ip("203.0.113.8"));
    }

    #[rstest]
    fn record_hashes_ip_when_present() {
        let record = SearchRecord::new("100", SearchQueryType::Code, true, Some("203.0.113.7"));
        assert_eq!(record.ip_hash.as_deref(), Some(hash_ip("203.0.113.7").as_str()));

        let anonymous = SearchRecord::new("100", SearchQueryType::Code, true, None);
        assert_eq!(anonymous.ip_hash, None);
    }

    #[tokio::test]
    async fn overview_aggregates_counts_and_rate() {
        let mut repo = MockSearchLogRepository::new();
        repo.expect_count_searches()
            .withf(|_, found| found.is_none())
            .return_once(|_, _| Ok(3));
        repo.expect_count_searches()
            .withf(|_, found| *found == Some(true))
            .return_once(|_, _| Ok(2));
        repo.expect_counts_by_type().return_once(|_| {
            Ok(vec![TypeCount {
                query_type: SearchQueryType::Code,
                count: 3,
            }])
        });
        repo.expect_recent_searches().return_once(|_, _| Ok(vec![]));

        let service = AnalyticsService::new(Arc::new(repo));
        let overview = service
            .overview(AnalyticsWindow::default(), None)
            .await
            .expect("overview");

        assert_eq!(overview.total_searches, 3);
        assert_eq!(overview.successful_searches, 2);
        assert_eq!(overview.failed_searches, 1);
        assert_eq!(overview.success_rate, "66.67%");
    }

    #[tokio::test]
    async fn overview_with_no_searches_reports_zero_rate() {
        let mut repo = MockSearchLogRepository::new();
        repo.expect_count_searches().times(2).returning(|_, _| Ok(0));
        repo.expect_counts_by_type().return_once(|_| Ok(vec![]));
        repo.expect_recent_searches().return_once(|_, _| Ok(vec![]));

        let service = AnalyticsService::new(Arc::new(repo));
        let overview = service
            .overview(AnalyticsWindow::default(), None)
            .await
            .expect("overview");

        assert_eq!(overview.success_rate, "0.00%");
    }

    #[tokio::test]
    async fn repository_failures_surface_as_domain_errors() {
        let mut repo = MockSearchLogRepository::new();
        repo.expect_count_searches()
            .returning(|_, _| Err(SearchLogRepositoryError::connection("refused")));
        repo.expect_counts_by_type()
            .returning(|_| Err(SearchLogRepositoryError::connection("refused")));
        repo.expect_recent_searches()
            .returning(|_, _| Err(SearchLogRepositoryError::connection("refused")));

        let service = AnalyticsService::new(Arc::new(repo));
        let error = service
            .overview(AnalyticsWindow::default(), None)
            .await
            .expect_err("connection error");

        assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
    }
}
