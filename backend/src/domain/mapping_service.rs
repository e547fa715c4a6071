//! Admin management of code↔size mappings.
//!
//! Creation parses and normalizes the size, reuses an existing unmapped size
//! row where one exists, and assigns a freshly issued public code. Updates
//! rewrite the size row in place so the code never regenerates. Deletion
//! removes the size and cascades its 1:1 code. Every mutation invalidates
//! the cached lookup entries for the affected code and size; stale entries
//! after an edit are a correctness bug, not an acceptable staleness window.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::Error;
use super::lookup_key::LookupCacheKey;
use super::normalizer::parse_size_components;
use super::ports::{
    CatalogRepository, CatalogRepositoryError, CodeIssuer, CodeIssuerError, LookupCache,
    LookupCacheError,
};
use super::tire::{TireCode, TireSize, TireVariant};

/// Input for [`MappingService::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateMappingRequest {
    pub size_raw: String,
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
}

/// Input for [`MappingService::update`]; every field is optional but at
/// least one must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMappingRequest {
    pub size_raw: Option<String>,
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
}

/// Snapshot of a mapping returned by every admin mutation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRecord {
    /// Mapping identifier: the tire code's primary key.
    pub id: Uuid,
    pub code_public: String,
    pub size_raw: String,
    pub size_normalized: String,
}

impl MappingRecord {
    fn from_pair(code: &TireCode, size: &TireSize) -> Self {
        Self {
            id: code.id,
            code_public: code.code_public.clone(),
            size_raw: size.size_raw.clone(),
            size_normalized: size.size_normalized.clone(),
        }
    }
}

/// Mapping administration over the catalog, cache, and code issuer.
#[derive(Clone)]
pub struct MappingService<C, K, G> {
    catalog: Arc<C>,
    cache: Arc<K>,
    code_issuer: Arc<G>,
}

impl<C, K, G> MappingService<C, K, G> {
    /// Create a new service with the given collaborators.
    pub fn new(catalog: Arc<C>, cache: Arc<K>, code_issuer: Arc<G>) -> Self {
        Self {
            catalog,
            cache,
            code_issuer,
        }
    }
}

impl<C, K, G> MappingService<C, K, G>
where
    C: CatalogRepository,
    K: LookupCache,
    G: CodeIssuer,
{
    fn map_catalog_error(error: CatalogRepositoryError) -> Error {
        match error {
            CatalogRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("catalog unavailable: {message}"))
            }
            CatalogRepositoryError::Query { message } => {
                Error::internal(format!("catalog error: {message}"))
            }
            // Race losers surface as conflicts, not crashes.
            CatalogRepositoryError::DuplicateKey { message } => Error::conflict(message),
        }
    }

    fn map_issuer_error(error: CodeIssuerError) -> Error {
        match error {
            CodeIssuerError::Backend { message } => {
                Error::service_unavailable(format!("code issuer unavailable: {message}"))
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

    fn validate_variant_pair(
        load_index: Option<i32>,
        speed_index: Option<&str>,
    ) -> Result<Option<(i32, String)>, Error> {
        match (load_index, speed_index) {
            (None, None) => Ok(None),
            (Some(li), Some(si)) => Ok(Some((li, si.to_ascii_uppercase()))),
            _ => Err(Error::incomplete_variant_params(
                "Both \"li\" and \"si\" are required",
            )),
        }
    }

    /// Drop every cached lookup entry for the given code and size.
    async fn invalidate_lookup_entries(
        &self,
        code_public: &str,
        size_normalized: &str,
    ) -> Result<(), Error> {
        self.cache
            .invalidate_prefix(&LookupCacheKey::code_prefix(code_public))
            .await
            .map_err(Self::map_cache_error)?;
        self.cache
            .invalidate_prefix(&LookupCacheKey::size_prefix(size_normalized))
            .await
            .map_err(Self::map_cache_error)
    }

    /// Attach a variant to a size unless an identical one already exists.
    /// Variants are immutable, so an exact duplicate is a no-op.
    async fn ensure_variant(
        &self,
        tire_size_id: Uuid,
        load_index: i32,
        speed_index: &str,
    ) -> Result<(), Error> {
        let existing = self
            .catalog
            .variants_by_size_id(tire_size_id)
            .await
            .map_err(Self::map_catalog_error)?;
        let duplicate = existing.iter().any(|variant: &TireVariant| {
            variant.load_index == Some(load_index)
                && variant.speed_index.as_deref() == Some(speed_index)
        });
        if duplicate {
            debug!(%tire_size_id, load_index, speed_index, "variant already present");
            return Ok(());
        }

        self.catalog
            .create_variant(tire_size_id, Some(load_index), Some(speed_index.to_owned()))
            .await
            .map_err(Self::map_catalog_error)?;
        Ok(())
    }

    /// Create a new mapping, issuing a fresh public code.
    ///
    /// # Errors
    ///
    /// `MissingParameter` for a blank size, `InvalidFormat` for a malformed
    /// one, `IncompleteVariantParams` for a half-specified variant, and
    /// `Conflict` when the normalized size already has a mapping.
    pub async fn create(&self, request: CreateMappingRequest) -> Result<MappingRecord, Error> {
        if request.size_raw.trim().is_empty() {
            warn!("create mapping rejected: sizeRaw is empty");
            return Err(Error::missing_parameter("\"sizeRaw\" is required"));
        }
        let components = parse_size_components(&request.size_raw)?;
        let variant =
            Self::validate_variant_pair(request.load_index, request.speed_index.as_deref())?;
        debug!(size = %components.size_normalized, "creating mapping");

        let size = match self
            .catalog
            .find_size_by_normalized(&components.size_normalized)
            .await
            .map_err(Self::map_catalog_error)?
        {
            Some(existing) => {
                let mapped = self
                    .catalog
                    .find_code_by_size_id(existing.id)
                    .await
                    .map_err(Self::map_catalog_error)?;
                if mapped.is_some() {
                    warn!(size = %components.size_normalized, "tire size already mapped");
                    return Err(Error::conflict(format!(
                        "Tire size \"{}\" already has a mapping",
                        components.size_normalized
                    )));
                }
                existing
            }
            None => self
                .catalog
                .create_size(&components)
                .await
                .map_err(Self::map_catalog_error)?,
        };

        let code_public = self
            .code_issuer
            .next_code()
            .await
            .map_err(Self::map_issuer_error)?;
        let code = self
            .catalog
            .create_code(&code_public, size.id)
            .await
            .map_err(Self::map_catalog_error)?;

        if let Some((load_index, speed_index)) = variant {
            self.ensure_variant(size.id, load_index, &speed_index)
                .await?;
        }

        self.invalidate_lookup_entries(&code.code_public, &size.size_normalized)
            .await?;

        debug!(id = %code.id, code = %code.code_public, "mapping created");
        Ok(MappingRecord::from_pair(&code, &size))
    }

    /// Update an existing mapping's size and/or attach a variant.
    ///
    /// The public code is never regenerated by a size update.
    ///
    /// # Errors
    ///
    /// `MissingParameter` when no field is given, `NotFound` for an unknown
    /// id, and `Conflict` when the target size collides with a different
    /// mapping.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateMappingRequest,
    ) -> Result<MappingRecord, Error> {
        let size_raw = request
            .size_raw
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if size_raw.is_none() && request.load_index.is_none() && request.speed_index.is_none() {
            warn!(%id, "update rejected: no fields provided");
            return Err(Error::missing_parameter(
                "Provide \"sizeRaw\" or a variant pair to update",
            ));
        }
        let variant =
            Self::validate_variant_pair(request.load_index, request.speed_index.as_deref())?;

        let code = self
            .catalog
            .find_code_by_id(id)
            .await
            .map_err(Self::map_catalog_error)?
            .ok_or_else(|| {
                warn!(%id, "mapping not found for update");
                Error::not_found(format!("Mapping \"{id}\" not found"))
            })?;
        let current_size = self
            .catalog
            .find_size_by_id(code.tire_size_id)
            .await
            .map_err(Self::map_catalog_error)?
            .ok_or_else(|| {
                Error::data_integrity(format!(
                    "tire size record missing for mapping \"{id}\""
                ))
            })?;

        let mut updated_size = current_size.clone();
        if let Some(raw) = size_raw {
            let components = parse_size_components(raw)?;
            let collision = self
                .catalog
                .find_size_by_normalized(&components.size_normalized)
                .await
                .map_err(Self::map_catalog_error)?;
            if collision.as_ref().is_some_and(|found| found.id != code.tire_size_id) {
                warn!(size = %components.size_normalized, "size conflict during update");
                return Err(Error::conflict(format!(
                    "Tire size \"{}\" already exists",
                    components.size_normalized
                )));
            }

            updated_size = self
                .catalog
                .update_size(code.tire_size_id, &components)
                .await
                .map_err(Self::map_catalog_error)?;
            debug!(%id, size = %updated_size.size_normalized, "mapping size updated");
        }

        if let Some((load_index, speed_index)) = variant {
            self.ensure_variant(code.tire_size_id, load_index, &speed_index)
                .await?;
        }

        self.invalidate_lookup_entries(&code.code_public, &current_size.size_normalized)
            .await?;
        if updated_size.size_normalized != current_size.size_normalized {
            self.invalidate_lookup_entries(&code.code_public, &updated_size.size_normalized)
                .await?;
        }

        Ok(MappingRecord::from_pair(&code, &updated_size))
    }

    /// Delete a mapping, returning its pre-deletion snapshot.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn delete(&self, id: Uuid) -> Result<MappingRecord, Error> {
        let code = self
            .catalog
            .find_code_by_id(id)
            .await
            .map_err(Self::map_catalog_error)?
            .ok_or_else(|| {
                warn!(%id, "mapping not found for delete");
                Error::not_found(format!("Mapping \"{id}\" not found"))
            })?;
        let size = self
            .catalog
            .find_size_by_id(code.tire_size_id)
            .await
            .map_err(Self::map_catalog_error)?
            .ok_or_else(|| {
                Error::data_integrity(format!(
                    "tire size record missing for mapping \"{id}\""
                ))
            })?;

        // Deleting the size cascades the 1:1 code and its variants.
        self.catalog
            .delete_size(size.id)
            .await
            .map_err(Self::map_catalog_error)?;
        self.invalidate_lookup_entries(&code.code_public, &size.size_normalized)
            .await?;

        debug!(%id, code = %code.code_public, "mapping deleted");
        Ok(MappingRecord::from_pair(&code, &size))
    }
}
