//! Domain types and services for the tire-code catalog.
//!
//! Everything here is transport agnostic. Collaborators (persistent store,
//! cache, search log, import queue, code issuer) are reached through the
//! traits in [`ports`]; the services are generic over them and carry no I/O
//! of their own beyond those boundaries.

pub mod csv_import;
pub mod error;
pub mod lookup_key;
pub mod lookup_service;
pub mod mapping_service;
pub mod normalizer;
pub mod ports;
pub mod search_analytics;
pub mod tire;
pub mod variant_input;

pub use self::csv_import::{CsvImportService, CsvRow, parse_rows};
pub use self::error::{Error, ErrorCode};
pub use self::lookup_key::{LookupCacheKey, LookupCacheKeyValidationError};
pub use self::lookup_service::{
    DEFAULT_CACHE_TTL, LookupOptions, LookupResponse, LookupService, VARIANT_NOT_FOUND_WARNING,
};
pub use self::mapping_service::{
    CreateMappingRequest, MappingRecord, MappingService, UpdateMappingRequest,
};
pub use self::normalizer::{SizeComponents, normalize, parse_size_components, parse_variant};
pub use self::search_analytics::{
    AnalyticsOverview, AnalyticsService, AnalyticsWindow, LoggedSearch, SearchQueryType,
    SearchRecord, TopSearch, TypeCount, hash_ip,
};
pub use self::tire::{TireCode, TireSize, TireVariant, VariantSpec, VariantSummary};
pub use self::variant_input::{ResolvedLookupInput, resolve_variant_input};
