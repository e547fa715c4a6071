//! Port for the persistent tire catalog.
//!
//! The store enforces uniqueness of `code_public`, `size_normalized`, and
//! the 1:1 `tire_size_id` on codes; violations surface as
//! [`CatalogRepositoryError::DuplicateKey`], distinguishable from plain
//! query failures so services can translate race losers into conflicts.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::normalizer::SizeComponents;
use crate::domain::tire::{TireCode, TireSize, TireVariant};

/// Errors raised by catalog repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogRepositoryError {
    /// Repository connection could not be established.
    #[error("catalog repository connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("catalog repository query failed: {message}")]
    Query { message: String },
    /// A uniqueness constraint rejected the write.
    #[error("catalog uniqueness violation: {message}")]
    DuplicateKey { message: String },
}

impl CatalogRepositoryError {
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

    /// Create a duplicate-key error with the given message.
    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::DuplicateKey {
            message: message.into(),
        }
    }
}

/// Port for tire size, code, and variant storage.
///
/// Deleting a size cascades its 1:1 code and its variants; variants are
/// insert-only. All lookups are key-unique.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fetch a code by its public identifier.
    async fn find_code_by_public(
        &self,
        code_public: &str,
    ) -> Result<Option<TireCode>, CatalogRepositoryError>;

    /// Fetch a code by primary key.
    async fn find_code_by_id(&self, id: Uuid) -> Result<Option<TireCode>, CatalogRepositoryError>;

    /// Fetch the code mapped to a size, if any.
    async fn find_code_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Option<TireCode>, CatalogRepositoryError>;

    /// Fetch a size by primary key.
    async fn find_size_by_id(&self, id: Uuid) -> Result<Option<TireSize>, CatalogRepositoryError>;

    /// Fetch a size by its canonical normalized string.
    async fn find_size_by_normalized(
        &self,
        size_normalized: &str,
    ) -> Result<Option<TireSize>, CatalogRepositoryError>;

    /// All variants attached to a size, in creation order.
    async fn variants_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Vec<TireVariant>, CatalogRepositoryError>;

    /// Insert a new size from parsed components.
    async fn create_size(
        &self,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError>;

    /// Insert a new code mapped to an existing size.
    async fn create_code(
        &self,
        code_public: &str,
        tire_size_id: Uuid,
    ) -> Result<TireCode, CatalogRepositoryError>;

    /// Insert a new variant for an existing size.
    async fn create_variant(
        &self,
        tire_size_id: Uuid,
        load_index: Option<i32>,
        speed_index: Option<String>,
    ) -> Result<TireVariant, CatalogRepositoryError>;

    /// Rewrite a size row in place from parsed components.
    async fn update_size(
        &self,
        id: Uuid,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError>;

    /// Delete a size, cascading its code and variants.
    async fn delete_size(&self, id: Uuid) -> Result<(), CatalogRepositoryError>;
}

/// Fixture implementation backed by nothing: every lookup misses and every
/// write is rejected. Use it in tests where catalog behaviour is not under
/// test.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCatalogRepository;

#[async_trait]
impl CatalogRepository for FixtureCatalogRepository {
    async fn find_code_by_public(
        &self,
        _code_public: &str,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn find_code_by_id(&self, _id: Uuid) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn find_code_by_size_id(
        &self,
        _tire_size_id: Uuid,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn find_size_by_id(&self, _id: Uuid) -> Result<Option<TireSize>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn find_size_by_normalized(
        &self,
        _size_normalized: &str,
    ) -> Result<Option<TireSize>, CatalogRepositoryError> {
        Ok(None)
    }

    async fn variants_by_size_id(
        &self,
        _tire_size_id: Uuid,
    ) -> Result<Vec<TireVariant>, CatalogRepositoryError> {
        Ok(Vec::new())
    }

    async fn create_size(
        &self,
        _components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        Err(CatalogRepositoryError::query("fixture catalog is read-only"))
    }

    async fn create_code(
        &self,
        _code_public: &str,
        _tire_size_id: Uuid,
    ) -> Result<TireCode, CatalogRepositoryError> {
        Err(CatalogRepositoryError::query("fixture catalog is read-only"))
    }

    async fn create_variant(
        &self,
        _tire_size_id: Uuid,
        _load_index: Option<i32>,
        _speed_index: Option<String>,
    ) -> Result<TireVariant, CatalogRepositoryError> {
        Err(CatalogRepositoryError::query("fixture catalog is read-only"))
    }

    async fn update_size(
        &self,
        _id: Uuid,
        _components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        Err(CatalogRepositoryError::query("fixture catalog is read-only"))
    }

    async fn delete_size(&self, _id: Uuid) -> Result<(), CatalogRepositoryError> {
        Err(CatalogRepositoryError::query("fixture catalog is read-only"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn fixture_lookups_miss() {
        let repo = FixtureCatalogRepository;

        assert_eq!(repo.find_code_by_public("100").await.expect("ok"), None);
        assert_eq!(repo.find_size_by_normalized("205/55R16").await.expect("ok"), None);
        assert!(repo.variants_by_size_id(Uuid::new_v4()).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn fixture_writes_are_rejected() {
        let repo = FixtureCatalogRepository;
        let err = repo
            .create_code("100", Uuid::new_v4())
            .await
            .expect_err("read-only");
        assert!(matches!(err, CatalogRepositoryError::Query { .. }));
    }

    #[rstest]
    fn error_constructors_accept_str() {
        let err = CatalogRepositoryError::duplicate_key("code already exists");
        assert!(err.to_string().contains("code already exists"));
    }
}
