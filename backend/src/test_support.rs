//! In-memory adapters for integration tests.
//!
//! These implement the domain ports with plain `Mutex`-guarded state so the
//! full lookup/mapping/import flows can be exercised without PostgreSQL or
//! Redis. Uniqueness rules mirror the database constraints, including
//! duplicate-key signalling.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::lookup_key::LookupCacheKey;
use crate::domain::lookup_service::LookupResponse;
use crate::domain::normalizer::SizeComponents;
use crate::domain::ports::{
    CatalogRepository, CatalogRepositoryError, ClaimedImportJob, CodeIssuer, CodeIssuerError,
    ImportJobId, ImportJobPayload, ImportJobState, ImportJobStatus, ImportQueue, ImportQueueError,
    ImportSummary, LookupCache, LookupCacheError, SearchLogRepository, SearchLogRepositoryError,
};
use crate::domain::search_analytics::{
    AnalyticsWindow, LoggedSearch, SearchRecord, TopSearch, TypeCount,
};
use crate::domain::tire::{TireCode, TireSize, TireVariant};

#[derive(Debug, Default)]
struct CatalogState {
    sizes: Vec<TireSize>,
    codes: Vec<TireCode>,
    variants: Vec<TireVariant>,
}

/// Mutex-guarded catalog mirroring the store's uniqueness constraints.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    state: Mutex<CatalogState>,
}

impl InMemoryCatalogRepository {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seed a complete mapping, returning the code id.
    ///
    /// # Panics
    ///
    /// Panics when the seed data violates catalog uniqueness.
    pub fn seed_mapping(
        &self,
        code_public: &str,
        components: &SizeComponents,
        variants: &[(i32, &str)],
    ) -> Uuid {
        let mut state = self.lock();
        assert!(
            !state
                .sizes
                .iter()
                .any(|size| size.size_normalized == components.size_normalized),
            "seed size already present"
        );
        assert!(
            !state.codes.iter().any(|code| code.code_public == code_public),
            "seed code already present"
        );

        let size = TireSize {
            id: Uuid::new_v4(),
            size_raw: components.size_raw.clone(),
            size_normalized: components.size_normalized.clone(),
            width: components.width,
            aspect_ratio: components.aspect_ratio,
            rim_diameter: components.rim_diameter,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let code = TireCode {
            id: Uuid::new_v4(),
            code_public: code_public.to_owned(),
            tire_size_id: size.id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let code_id = code.id;
        for (load_index, speed_index) in variants {
            let variant = TireVariant {
                id: Uuid::new_v4(),
                tire_size_id: size.id,
                load_index: Some(*load_index),
                speed_index: Some((*speed_index).to_owned()),
                created_at: Utc::now(),
            };
            state.variants.push(variant);
        }
        state.sizes.push(size);
        state.codes.push(code);
        code_id
    }

    /// Number of catalogued sizes.
    #[must_use]
    pub fn size_count(&self) -> usize {
        self.lock().sizes.len()
    }

    /// Number of catalogued variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.lock().variants.len()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_code_by_public(
        &self,
        code_public: &str,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(self
            .lock()
            .codes
            .iter()
            .find(|code| code.code_public == code_public)
            .cloned())
    }

    async fn find_code_by_id(&self, id: Uuid) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(self.lock().codes.iter().find(|code| code.id == id).cloned())
    }

    async fn find_code_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(self
            .lock()
            .codes
            .iter()
            .find(|code| code.tire_size_id == tire_size_id)
            .cloned())
    }

    async fn find_size_by_id(&self, id: Uuid) -> Result<Option<TireSize>, CatalogRepositoryError> {
        Ok(self.lock().sizes.iter().find(|size| size.id == id).cloned())
    }

    async fn find_size_by_normalized(
        &self,
        size_normalized: &str,
    ) -> Result<Option<TireSize>, CatalogRepositoryError> {
        Ok(self
            .lock()
            .sizes
            .iter()
            .find(|size| size.size_normalized == size_normalized)
            .cloned())
    }

    async fn variants_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Vec<TireVariant>, CatalogRepositoryError> {
        Ok(self
            .lock()
            .variants
            .iter()
            .filter(|variant| variant.tire_size_id == tire_size_id)
            .cloned()
            .collect())
    }

    async fn create_size(
        &self,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        let mut state = self.lock();
        if state
            .sizes
            .iter()
            .any(|size| size.size_normalized == components.size_normalized)
        {
            return Err(CatalogRepositoryError::duplicate_key(format!(
                "Tire size \"{}\" already exists",
                components.size_normalized
            )));
        }

        let size = TireSize {
            id: Uuid::new_v4(),
            size_raw: components.size_raw.clone(),
            size_normalized: components.size_normalized.clone(),
            width: components.width,
            aspect_ratio: components.aspect_ratio,
            rim_diameter: components.rim_diameter,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.sizes.push(size.clone());
        Ok(size)
    }

    async fn create_code(
        &self,
        code_public: &str,
        tire_size_id: Uuid,
    ) -> Result<TireCode, CatalogRepositoryError> {
        let mut state = self.lock();
        if state.codes.iter().any(|code| code.code_public == code_public) {
            return Err(CatalogRepositoryError::duplicate_key(format!(
                "Tire code \"{code_public}\" already exists"
            )));
        }
        if state
            .codes
            .iter()
            .any(|code| code.tire_size_id == tire_size_id)
        {
            return Err(CatalogRepositoryError::duplicate_key(
                "tire size already has a code",
            ));
        }

        let code = TireCode {
            id: Uuid::new_v4(),
            code_public: code_public.to_owned(),
            tire_size_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.codes.push(code.clone());
        Ok(code)
    }

    async fn create_variant(
        &self,
        tire_size_id: Uuid,
        load_index: Option<i32>,
        speed_index: Option<String>,
    ) -> Result<TireVariant, CatalogRepositoryError> {
        let variant = TireVariant {
            id: Uuid::new_v4(),
            tire_size_id,
            load_index,
            speed_index,
            created_at: Utc::now(),
        };
        self.lock().variants.push(variant.clone());
        Ok(variant)
    }

    async fn update_size(
        &self,
        id: Uuid,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        let mut state = self.lock();
        if state
            .sizes
            .iter()
            .any(|size| size.size_normalized == components.size_normalized && size.id != id)
        {
            return Err(CatalogRepositoryError::duplicate_key(format!(
                "Tire size \"{}\" already exists",
                components.size_normalized
            )));
        }

        let Some(size) = state.sizes.iter_mut().find(|size| size.id == id) else {
            return Err(CatalogRepositoryError::query("size not found for update"));
        };
        size.size_raw = components.size_raw.clone();
        size.size_normalized = components.size_normalized.clone();
        size.width = components.width;
        size.aspect_ratio = components.aspect_ratio;
        size.rim_diameter = components.rim_diameter;
        size.updated_at = Utc::now();
        Ok(size.clone())
    }

    async fn delete_size(&self, id: Uuid) -> Result<(), CatalogRepositoryError> {
        let mut state = self.lock();
        let before = state.sizes.len();
        state.sizes.retain(|size| size.id != id);
        if state.sizes.len() == before {
            return Err(CatalogRepositoryError::query("size not found for delete"));
        }
        state.codes.retain(|code| code.tire_size_id != id);
        state.variants.retain(|variant| variant.tire_size_id != id);
        Ok(())
    }
}

/// TTL-aware in-memory cache with inspection helpers.
#[derive(Debug, Default)]
pub struct InMemoryLookupCache {
    entries: Mutex<HashMap<String, (LookupResponse, Instant)>>,
}

impl InMemoryLookupCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (LookupResponse, Instant)>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|(_, expires)| *expires > now)
            .count()
    }

    /// True when no live entry exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when a live entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|(_, expires)| *expires > Instant::now())
    }
}

#[async_trait]
impl LookupCache for InMemoryLookupCache {
    async fn get(&self, key: &LookupCacheKey) -> Result<Option<LookupResponse>, LookupCacheError> {
        Ok(self
            .lock()
            .get(key.as_str())
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(response, _)| response.clone()))
    }

    async fn put(
        &self,
        key: &LookupCacheKey,
        response: &LookupResponse,
        ttl: Duration,
    ) -> Result<(), LookupCacheError> {
        self.lock().insert(
            key.as_str().to_owned(),
            (response.clone(), Instant::now() + ttl),
        );
        Ok(())
    }

    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), LookupCacheError> {
        self.lock().retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// Recording search log with in-memory analytics.
#[derive(Debug, Default)]
pub struct RecordingSearchLog {
    entries: Mutex<Vec<(SearchRecord, DateTime<Utc>)>>,
}

impl RecordingSearchLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SearchRecord, DateTime<Utc>)>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of the appended records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<SearchRecord> {
        self.lock().iter().map(|(record, _)| record.clone()).collect()
    }

    /// Bulk-clear the log.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn in_window(window: AnalyticsWindow, at: DateTime<Utc>) -> bool {
        window.start.is_none_or(|start| at >= start) && window.end.is_none_or(|end| at <= end)
    }
}

#[async_trait]
impl SearchLogRepository for RecordingSearchLog {
    async fn append(&self, record: SearchRecord) -> Result<(), SearchLogRepositoryError> {
        self.lock().push((record, Utc::now()));
        Ok(())
    }

    async fn count_searches(
        &self,
        window: AnalyticsWindow,
        result_found: Option<bool>,
    ) -> Result<i64, SearchLogRepositoryError> {
        let count = self
            .lock()
            .iter()
            .filter(|(record, at)| {
                Self::in_window(window, *at)
                    && result_found.is_none_or(|found| record.result_found == found)
            })
            .count();
        Ok(count as i64)
    }

    async fn counts_by_type(
        &self,
        window: AnalyticsWindow,
    ) -> Result<Vec<TypeCount>, SearchLogRepositoryError> {
        let mut counts: HashMap<&'static str, (crate::domain::SearchQueryType, i64)> =
            HashMap::new();
        for (record, at) in self.lock().iter() {
            if Self::in_window(window, *at) {
                let entry = counts
                    .entry(record.query_type.as_str())
                    .or_insert((record.query_type, 0));
                entry.1 += 1;
            }
        }
        Ok(counts
            .into_values()
            .map(|(query_type, count)| TypeCount { query_type, count })
            .collect())
    }

    async fn recent_searches(
        &self,
        window: AnalyticsWindow,
        limit: i64,
    ) -> Result<Vec<LoggedSearch>, SearchLogRepositoryError> {
        let mut entries: Vec<LoggedSearch> = self
            .lock()
            .iter()
            .filter(|(_, at)| Self::in_window(window, *at))
            .map(|(record, at)| LoggedSearch {
                query: record.query.clone(),
                query_type: record.query_type,
                result_found: record.result_found,
                created_at: *at,
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn top_searches(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<TopSearch>, SearchLogRepositoryError> {
        let mut grouped: HashMap<(String, &'static str, bool), (TopSearch, i64)> = HashMap::new();
        for (record, at) in self.lock().iter() {
            if *at < since {
                continue;
            }
            let key = (
                record.query.clone(),
                record.query_type.as_str(),
                record.result_found,
            );
            let entry = grouped.entry(key).or_insert((
                TopSearch {
                    query: record.query.clone(),
                    query_type: record.query_type,
                    result_found: record.result_found,
                    count: 0,
                },
                0,
            ));
            entry.1 += 1;
        }

        let mut ranked: Vec<TopSearch> = grouped
            .into_values()
            .map(|(mut top, count)| {
                top.count = count;
                top
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(ranked)
    }
}

#[derive(Debug, Clone)]
struct StoredJob {
    id: ImportJobId,
    payload: ImportJobPayload,
    state: ImportJobState,
    attempts: i32,
    result: Option<ImportSummary>,
    last_error: Option<String>,
    submitted_at: DateTime<Utc>,
}

/// In-memory import queue with claim/complete/fail semantics.
#[derive(Debug, Default)]
pub struct InMemoryImportQueue {
    jobs: Mutex<Vec<StoredJob>>,
}

impl InMemoryImportQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredJob>> {
        self.jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of jobs ever submitted.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.lock().len()
    }
}

#[async_trait]
impl ImportQueue for InMemoryImportQueue {
    async fn submit(&self, payload: &ImportJobPayload) -> Result<ImportJobId, ImportQueueError> {
        let id = ImportJobId::random();
        self.lock().push(StoredJob {
            id,
            payload: payload.clone(),
            state: ImportJobState::Queued,
            attempts: 0,
            result: None,
            last_error: None,
            submitted_at: payload.submitted_at,
        });
        Ok(id)
    }

    async fn status(&self, id: ImportJobId) -> Result<Option<ImportJobStatus>, ImportQueueError> {
        Ok(self.lock().iter().find(|job| job.id == id).map(|job| {
            ImportJobStatus {
                id: job.id,
                state: job.state,
                attempts: job.attempts,
                result: job.result.clone(),
                last_error: job.last_error.clone(),
                submitted_at: job.submitted_at,
            }
        }))
    }

    async fn claim_next(&self) -> Result<Option<ClaimedImportJob>, ImportQueueError> {
        let mut jobs = self.lock();
        // Vec order is submission order, so the first queued entry is FIFO.
        let Some(job) = jobs
            .iter_mut()
            .find(|job| job.state == ImportJobState::Queued)
        else {
            return Ok(None);
        };

        job.state = ImportJobState::Running;
        job.attempts += 1;
        Ok(Some(ClaimedImportJob {
            id: job.id,
            payload: job.payload.clone(),
            attempts: job.attempts,
        }))
    }

    async fn mark_completed(
        &self,
        id: ImportJobId,
        summary: &ImportSummary,
    ) -> Result<(), ImportQueueError> {
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Err(ImportQueueError::backend("job not found"));
        };
        job.state = ImportJobState::Completed;
        job.result = Some(summary.clone());
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: ImportJobId,
        error: &str,
        retry: bool,
    ) -> Result<(), ImportQueueError> {
        let mut jobs = self.lock();
        let Some(job) = jobs.iter_mut().find(|job| job.id == id) else {
            return Err(ImportQueueError::backend("job not found"));
        };
        job.state = if retry {
            ImportJobState::Queued
        } else {
            ImportJobState::Failed
        };
        job.last_error = Some(error.to_owned());
        Ok(())
    }
}

/// Issues sequential numeric codes, starting at 100 like the seed catalog.
#[derive(Debug)]
pub struct SequentialCodeIssuer {
    next: AtomicI64,
}

impl SequentialCodeIssuer {
    /// Start issuing from 100.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(100)
    }

    /// Start issuing from the given number.
    #[must_use]
    pub fn starting_at(first: i64) -> Self {
        Self {
            next: AtomicI64::new(first),
        }
    }
}

impl Default for SequentialCodeIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CodeIssuer for SequentialCodeIssuer {
    async fn next_code(&self) -> Result<String, CodeIssuerError> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst).to_string())
    }
}
