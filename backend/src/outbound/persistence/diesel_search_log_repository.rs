//! PostgreSQL-backed `SearchLogRepository` implementation using Diesel ORM.
//!
//! Appends are single-row inserts; the analytics queries aggregate with
//! `COUNT` and `GROUP BY`. Optional window bounds are widened to the full
//! range when absent so every query shape stays statically typed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{SearchLogRepository, SearchLogRepositoryError};
use crate::domain::search_analytics::{
    AnalyticsWindow, LoggedSearch, SearchQueryType, SearchRecord, TopSearch, TypeCount,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::NewSearchLogRow;
use super::pool::DbPool;
use super::schema::search_logs;

/// Diesel-backed implementation of the `SearchLogRepository` port.
#[derive(Clone)]
pub struct DieselSearchLogRepository {
    pool: DbPool,
}

impl DieselSearchLogRepository {
    /// Create a new repository with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: diesel::result::Error) -> SearchLogRepositoryError {
    map_diesel_error(
        error,
        SearchLogRepositoryError::query,
        SearchLogRepositoryError::connection,
        SearchLogRepositoryError::query,
    )
}

fn parse_query_type(value: &str) -> SearchQueryType {
    match value {
        "code" => SearchQueryType::Code,
        "size" => SearchQueryType::Size,
        _ => SearchQueryType::Unknown,
    }
}

/// Widen optional window bounds to a concrete closed range.
fn window_bounds(window: AnalyticsWindow) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        window.start.unwrap_or(DateTime::<Utc>::MIN_UTC),
        window.end.unwrap_or_else(Utc::now),
    )
}

#[async_trait]
impl SearchLogRepository for DieselSearchLogRepository {
    async fn append(&self, record: SearchRecord) -> Result<(), SearchLogRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, SearchLogRepositoryError::connection))?;

        diesel::insert_into(search_logs::table)
            .values(NewSearchLogRow {
                id: Uuid::new_v4(),
                query: record.query.as_str(),
                query_type: record.query_type.as_str(),
                result_found: record.result_found,
                ip_hash: record.ip_hash.as_deref(),
            })
            .execute(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(())
    }

    async fn count_searches(
        &self,
        window: AnalyticsWindow,
        result_found: Option<bool>,
    ) -> Result<i64, SearchLogRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, SearchLogRepositoryError::connection))?;
        let (start, end) = window_bounds(window);

        let mut query = search_logs::table
            .filter(search_logs::created_at.ge(start))
            .filter(search_logs::created_at.le(end))
            .select(count_star())
            .into_boxed();
        if let Some(found) = result_found {
            query = query.filter(search_logs::result_found.eq(found));
        }

        query.first(&mut conn).await.map_err(map_error)
    }

    async fn counts_by_type(
        &self,
        window: AnalyticsWindow,
    ) -> Result<Vec<TypeCount>, SearchLogRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, SearchLogRepositoryError::connection))?;
        let (start, end) = window_bounds(window);

        let rows: Vec<(String, i64)> = search_logs::table
            .filter(search_logs::created_at.ge(start))
            .filter(search_logs::created_at.le(end))
            .group_by(search_logs::query_type)
            .select((search_logs::query_type, count_star()))
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(rows
            .into_iter()
            .map(|(query_type, count)| TypeCount {
                query_type: parse_query_type(&query_type),
                count,
            })
            .collect())
    }

    async fn recent_searches(
        &self,
        window: AnalyticsWindow,
        limit: i64,
    ) -> Result<Vec<LoggedSearch>, SearchLogRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, SearchLogRepositoryError::connection))?;
        let (start, end) = window_bounds(window);

        let rows: Vec<(String, String, bool, DateTime<Utc>)> = search_logs::table
            .filter(search_logs::created_at.ge(start))
            .filter(search_logs::created_at.le(end))
            .order(search_logs::created_at.desc())
            .limit(limit)
            .select((
                search_logs::query,
                search_logs::query_type,
                search_logs::result_found,
                search_logs::created_at,
            ))
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(rows
            .into_iter()
            .map(|(query, query_type, result_found, created_at)| LoggedSearch {
                query,
                query_type: parse_query_type(&query_type),
                result_found,
                created_at,
            })
            .collect())
    }

    async fn top_searches(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TopSearch>, SearchLogRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, SearchLogRepositoryError::connection))?;

        let rows: Vec<(String, String, bool, i64)> = search_logs::table
            .filter(search_logs::created_at.ge(since))
            .group_by((
                search_logs::query,
                search_logs::query_type,
                search_logs::result_found,
            ))
            .select((
                search_logs::query,
                search_logs::query_type,
                search_logs::result_found,
                count_star(),
            ))
            .order(count_star().desc())
            .limit(limit)
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(rows
            .into_iter()
            .map(|(query, query_type, result_found, count)| TopSearch {
                query,
                query_type: parse_query_type(&query_type),
                result_found,
                count,
            })
            .collect())
    }
}
