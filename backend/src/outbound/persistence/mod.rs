//! Diesel/PostgreSQL persistence adapters for the domain ports.

mod diesel_catalog_repository;
mod diesel_error_mapping;
mod diesel_import_queue;
mod diesel_search_log_repository;
pub mod models;
mod pool;
pub mod schema;
mod sequence_code_issuer;

pub use diesel_catalog_repository::DieselCatalogRepository;
pub use diesel_import_queue::DieselImportQueue;
pub use diesel_search_log_repository::DieselSearchLogRepository;
pub use pool::{DbPool, PoolConfig, PoolError};
pub use sequence_code_issuer::SequenceCodeIssuer;
