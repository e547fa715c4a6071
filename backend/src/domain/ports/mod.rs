//! Domain ports and supporting types for the hexagonal boundary.

mod catalog_repository;
mod code_issuer;
mod import_queue;
mod lookup_cache;
mod search_log_repository;

#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
pub use catalog_repository::{CatalogRepository, CatalogRepositoryError, FixtureCatalogRepository};
#[cfg(test)]
pub use code_issuer::MockCodeIssuer;
pub use code_issuer::{CodeIssuer, CodeIssuerError, FixtureCodeIssuer};
#[cfg(test)]
pub use import_queue::MockImportQueue;
pub use import_queue::{
    ClaimedImportJob, FixtureImportQueue, ImportJobId, ImportJobPayload, ImportJobState,
    ImportJobStatus, ImportQueue, ImportQueueError, ImportSummary,
};
#[cfg(test)]
pub use lookup_cache::MockLookupCache;
pub use lookup_cache::{FixtureLookupCache, LookupCache, LookupCacheError};
#[cfg(test)]
pub use search_log_repository::MockSearchLogRepository;
pub use search_log_repository::{
    FixtureSearchLogRepository, SearchLogRepository, SearchLogRepositoryError,
};
