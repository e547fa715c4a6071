//! PostgreSQL-backed `CatalogRepository` implementation using Diesel ORM.
//!
//! Uniqueness of `code_public`, `size_normalized`, and the 1:1
//! `tire_size_id` is enforced by the database; violations map to
//! `DuplicateKey` so services can translate concurrent-write losers into
//! conflicts. Deleting a size relies on `ON DELETE CASCADE` to remove its
//! code and variants.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::normalizer::SizeComponents;
use crate::domain::ports::{CatalogRepository, CatalogRepositoryError};
use crate::domain::tire::{TireCode, TireSize, TireVariant};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{
    NewTireCodeRow, NewTireSizeRow, NewTireVariantRow, TireCodeRow, TireSizeRow, TireVariantRow,
};
use super::pool::DbPool;
use super::schema::{tire_codes, tire_sizes, tire_variants};

/// Diesel-backed implementation of the `CatalogRepository` port.
#[derive(Clone)]
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    /// Create a new repository with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn connection(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        CatalogRepositoryError,
    > {
        self.pool
            .get()
            .await
            .map_err(|error| map_pool_error(error, CatalogRepositoryError::connection))
    }
}

fn map_error(error: diesel::result::Error) -> CatalogRepositoryError {
    map_diesel_error(
        error,
        CatalogRepositoryError::query,
        CatalogRepositoryError::connection,
        CatalogRepositoryError::duplicate_key,
    )
}

#[async_trait]
impl CatalogRepository for DieselCatalogRepository {
    async fn find_code_by_public(
        &self,
        code_public: &str,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: Option<TireCodeRow> = tire_codes::table
            .filter(tire_codes::code_public.eq(code_public))
            .select(TireCodeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        Ok(row.map(TireCode::from))
    }

    async fn find_code_by_id(&self, id: Uuid) -> Result<Option<TireCode>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: Option<TireCodeRow> = tire_codes::table
            .find(id)
            .select(TireCodeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        Ok(row.map(TireCode::from))
    }

    async fn find_code_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Option<TireCode>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: Option<TireCodeRow> = tire_codes::table
            .filter(tire_codes::tire_size_id.eq(tire_size_id))
            .select(TireCodeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        Ok(row.map(TireCode::from))
    }

    async fn find_size_by_id(&self, id: Uuid) -> Result<Option<TireSize>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: Option<TireSizeRow> = tire_sizes::table
            .find(id)
            .select(TireSizeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        Ok(row.map(TireSize::from))
    }

    async fn find_size_by_normalized(
        &self,
        size_normalized: &str,
    ) -> Result<Option<TireSize>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: Option<TireSizeRow> = tire_sizes::table
            .filter(tire_sizes::size_normalized.eq(size_normalized))
            .select(TireSizeRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        Ok(row.map(TireSize::from))
    }

    async fn variants_by_size_id(
        &self,
        tire_size_id: Uuid,
    ) -> Result<Vec<TireVariant>, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let rows: Vec<TireVariantRow> = tire_variants::table
            .filter(tire_variants::tire_size_id.eq(tire_size_id))
            .order(tire_variants::created_at.asc())
            .select(TireVariantRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(rows.into_iter().map(TireVariant::from).collect())
    }

    async fn create_size(
        &self,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: TireSizeRow = diesel::insert_into(tire_sizes::table)
            .values(NewTireSizeRow::from_components(components))
            .returning(TireSizeRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(TireSize::from(row))
    }

    async fn create_code(
        &self,
        code_public: &str,
        tire_size_id: Uuid,
    ) -> Result<TireCode, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: TireCodeRow = diesel::insert_into(tire_codes::table)
            .values(NewTireCodeRow {
                id: Uuid::new_v4(),
                code_public,
                tire_size_id,
            })
            .returning(TireCodeRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(TireCode::from(row))
    }

    async fn create_variant(
        &self,
        tire_size_id: Uuid,
        load_index: Option<i32>,
        speed_index: Option<String>,
    ) -> Result<TireVariant, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: TireVariantRow = diesel::insert_into(tire_variants::table)
            .values(NewTireVariantRow {
                id: Uuid::new_v4(),
                tire_size_id,
                load_index,
                speed_index: speed_index.as_deref(),
            })
            .returning(TireVariantRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(TireVariant::from(row))
    }

    async fn update_size(
        &self,
        id: Uuid,
        components: &SizeComponents,
    ) -> Result<TireSize, CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let row: TireSizeRow = diesel::update(tire_sizes::table.find(id))
            .set((
                tire_sizes::size_raw.eq(components.size_raw.as_str()),
                tire_sizes::size_normalized.eq(components.size_normalized.as_str()),
                tire_sizes::width.eq(components.width),
                tire_sizes::aspect_ratio.eq(components.aspect_ratio),
                tire_sizes::rim_diameter.eq(components.rim_diameter),
                tire_sizes::updated_at.eq(Utc::now()),
            ))
            .returning(TireSizeRow::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(TireSize::from(row))
    }

    async fn delete_size(&self, id: Uuid) -> Result<(), CatalogRepositoryError> {
        let mut conn = self.connection().await?;

        let deleted = diesel::delete(tire_sizes::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;
        if deleted == 0 {
            return Err(CatalogRepositoryError::query("size not found for delete"));
        }

        Ok(())
    }
}
