//! Code↔size lookup resolution.
//!
//! Each request resolves its effective variant, consults the cache, and on a
//! miss resolves the primary entity before fetching the counterpart and the
//! variant list together. Successful resolutions are cached and logged;
//! misses are logged and never cached. Search logging is fire-and-forget:
//! failures are swallowed at the dispatch boundary and never reach the
//! caller.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::Error;
use super::lookup_key::LookupCacheKey;
use super::normalizer::normalize;
use super::ports::{
    CatalogRepository, CatalogRepositoryError, LookupCache, LookupCacheError, SearchLogRepository,
};
use super::search_analytics::{SearchQueryType, SearchRecord};
use super::tire::{TireSize, TireVariant, VariantSpec, VariantSummary};
use super::variant_input::resolve_variant_input;

/// Warning value returned when the base mapping exists but the requested
/// variant does not.
pub const VARIANT_NOT_FOUND_WARNING: &str = "variant_not_found";

/// Default lifetime of cached lookup responses.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Optional qualifiers accompanying a lookup request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
    /// Caller IP, hashed before it reaches the search log.
    pub client_ip: Option<String>,
}

/// A resolved code↔size mapping, as returned to callers and stored in the
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub code: String,
    pub size_normalized: String,
    pub size_raw: String,
    /// The single matched variant, present only when one was requested and
    /// found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSummary>,
    /// Full variant list; omitted entirely when the size has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantSummary>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl LookupResponse {
    fn base(code: impl Into<String>, size: &TireSize) -> Self {
        Self {
            code: code.into(),
            size_normalized: size.size_normalized.clone(),
            size_raw: size.size_raw.clone(),
            variant: None,
            variants: None,
            warning: None,
        }
    }
}

/// Lookup resolution service over the catalog, cache, and search log.
#[derive(Clone)]
pub struct LookupService<C, K, L> {
    catalog: Arc<C>,
    cache: Arc<K>,
    search_log: Arc<L>,
    cache_ttl: Duration,
}

impl<C, K, L> LookupService<C, K, L> {
    /// Create a service with the default one-hour cache lifetime.
    pub fn new(catalog: Arc<C>, cache: Arc<K>, search_log: Arc<L>) -> Self {
        Self {
            catalog,
            cache,
            search_log,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override the cache lifetime.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl<C, K, L> LookupService<C, K, L>
where
    C: CatalogRepository,
    K: LookupCache,
    L: SearchLogRepository + 'static,
{
    fn map_catalog_error(error: CatalogRepositoryError) -> Error {
        match error {
            CatalogRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("catalog unavailable: {message}"))
            }
            CatalogRepositoryError::Query { message } => {
                Error::internal(format!("catalog error: {message}"))
            }
            CatalogRepositoryError::DuplicateKey { message } => {
                Error::internal(format!("unexpected uniqueness violation: {message}"))
            }
        }
    }

    fn map_cache_error(error: LookupCacheError) -> Error {
        match error {
            LookupCacheError::Backend { message } => {
                Error::service_unavailable(format!("lookup cache unavailable: {message}"))
            }
            LookupCacheError::Serialization { message } => {
                Error::internal(format!("lookup cache serialisation failed: {message}"))
            }
        }
    }

    /// Dispatch a search-log append without awaiting it. Failures are logged
    /// locally and discarded; they must never fail the originating request.
    fn log_search_detached(
        &self,
        query: String,
        query_type: SearchQueryType,
        result_found: bool,
        client_ip: Option<String>,
    ) {
        let sink = Arc::clone(&self.search_log);
        tokio::spawn(async move {
            let record = SearchRecord::new(query, query_type, result_found, client_ip.as_deref());
            if let Err(error) = sink.append(record).await {
                debug!(%error, "search log append failed");
            }
        });
    }

    /// Resolve a mapping by public code.
    ///
    /// # Errors
    ///
    /// `MissingParameter` for blank input, `IncompleteVariantParams` for a
    /// half-specified explicit variant, `NotFound` for an unknown code, and
    /// `DataIntegrity` when the code's size record is missing.
    pub async fn find_by_code(
        &self,
        code: &str,
        options: LookupOptions,
    ) -> Result<LookupResponse, Error> {
        let resolved = resolve_variant_input(
            Some(code),
            None,
            options.load_index,
            options.speed_index.as_deref(),
        )?;
        let Some(code_query) = resolved.code.filter(|value| !value.is_empty()) else {
            warn!("code lookup rejected: code is empty");
            return Err(Error::missing_parameter("\"code\" is required"));
        };
        debug!(code = %code_query, variant = ?resolved.variant, "lookup by code");

        let key = LookupCacheKey::for_code(&code_query, resolved.variant.as_ref());
        if let Some(cached) = self.cache.get(&key).await.map_err(Self::map_cache_error)? {
            debug!(key = %key, "cache hit for code lookup");
            return Ok(cached);
        }

        let Some(tire_code) = self
            .catalog
            .find_code_by_public(&code_query)
            .await
            .map_err(Self::map_catalog_error)?
        else {
            warn!(code = %code_query, "tire code not found");
            self.log_search_detached(
                code_query.clone(),
                SearchQueryType::Code,
                false,
                options.client_ip,
            );
            return Err(Error::not_found(format!(
                "Tire code \"{code_query}\" not found"
            )));
        };

        // Independent reads; issue them together rather than sequentially.
        let (size, variants) = tokio::join!(
            self.catalog.find_size_by_id(tire_code.tire_size_id),
            self.catalog.variants_by_size_id(tire_code.tire_size_id),
        );
        let size = size.map_err(Self::map_catalog_error)?.ok_or_else(|| {
            Error::data_integrity(format!(
                "tire size record missing for code \"{code_query}\""
            ))
        })?;
        let variants = variants.map_err(Self::map_catalog_error)?;

        self.finish_resolution(
            key,
            code_query,
            SearchQueryType::Code,
            tire_code.code_public,
            &size,
            &variants,
            resolved.variant,
            options.client_ip,
        )
        .await
    }

    /// Resolve a mapping by (possibly denormalized) size string.
    ///
    /// # Errors
    ///
    /// `MissingParameter` for blank input, `InvalidFormat` for a malformed
    /// size, `NotFound` for an uncatalogued size, and `DataIntegrity` when
    /// the size has no mapped code.
    pub async fn find_by_size(
        &self,
        size: &str,
        options: LookupOptions,
    ) -> Result<LookupResponse, Error> {
        let resolved = resolve_variant_input(
            None,
            Some(size),
            options.load_index,
            options.speed_index.as_deref(),
        )?;
        let Some(size_query) = resolved.size.filter(|value| !value.is_empty()) else {
            warn!("size lookup rejected: size is empty");
            return Err(Error::missing_parameter("\"size\" is required"));
        };
        let normalized = normalize(&size_query)?;
        debug!(size = %size_query, normalized = %normalized, variant = ?resolved.variant, "lookup by size");

        let key = LookupCacheKey::for_size(&normalized, resolved.variant.as_ref());
        if let Some(cached) = self.cache.get(&key).await.map_err(Self::map_cache_error)? {
            debug!(key = %key, "cache hit for size lookup");
            return Ok(cached);
        }

        let Some(tire_size) = self
            .catalog
            .find_size_by_normalized(&normalized)
            .await
            .map_err(Self::map_catalog_error)?
        else {
            warn!(size = %normalized, "tire size not found");
            self.log_search_detached(
                normalized.clone(),
                SearchQueryType::Size,
                false,
                options.client_ip,
            );
            return Err(Error::not_found(format!(
                "Tire size \"{normalized}\" not found"
            )));
        };

        // Independent reads; issue them together rather than sequentially.
        let (code, variants) = tokio::join!(
            self.catalog.find_code_by_size_id(tire_size.id),
            self.catalog.variants_by_size_id(tire_size.id),
        );
        let code = code.map_err(Self::map_catalog_error)?.ok_or_else(|| {
            Error::data_integrity(format!("no code mapped to tire size \"{normalized}\""))
        })?;
        let variants = variants.map_err(Self::map_catalog_error)?;

        self.finish_resolution(
            key,
            normalized,
            SearchQueryType::Size,
            code.code_public,
            &tire_size,
            &variants,
            resolved.variant,
            options.client_ip,
        )
        .await
    }

    /// Shared tail of both lookup axes: shape the response, write the cache
    /// entry, and log the successful resolution.
    #[expect(
        clippy::too_many_arguments,
        reason = "single internal call site per lookup axis"
    )]
    async fn finish_resolution(
        &self,
        key: LookupCacheKey,
        query: String,
        query_type: SearchQueryType,
        code_public: String,
        size: &TireSize,
        variants: &[TireVariant],
        requested: Option<VariantSpec>,
        client_ip: Option<String>,
    ) -> Result<LookupResponse, Error> {
        let mut response = LookupResponse::base(code_public, size);

        if let Some(spec) = requested {
            if let Some(matched) = variants.iter().find(|variant| spec.matches(variant)) {
                debug!(query = %query, variant = %spec.token(), "lookup resolved with variant");
                response.variant = Some(VariantSummary::from(matched));
            } else {
                warn!(query = %query, variant = %spec.token(), "variant not found");
                response.warning = Some(VARIANT_NOT_FOUND_WARNING.to_owned());
            }
        } else if !variants.is_empty() {
            response.variants = Some(variants.iter().map(VariantSummary::from).collect());
        }

        self.cache
            .put(&key, &response, self.cache_ttl)
            .await
            .map_err(Self::map_cache_error)?;
        self.log_search_detached(query, query_type, true, client_ip);

        Ok(response)
    }
}
