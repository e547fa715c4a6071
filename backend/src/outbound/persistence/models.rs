//! Row structs bridging Diesel tables and domain entities.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::normalizer::SizeComponents;
use crate::domain::tire::{TireCode, TireSize, TireVariant};

use super::schema::{import_jobs, search_logs, tire_codes, tire_sizes, tire_variants};

/// Read model for `tire_sizes`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tire_sizes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TireSizeRow {
    pub id: Uuid,
    pub size_raw: String,
    pub size_normalized: String,
    pub width: i32,
    pub aspect_ratio: i32,
    pub rim_diameter: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TireSizeRow> for TireSize {
    fn from(row: TireSizeRow) -> Self {
        Self {
            id: row.id,
            size_raw: row.size_raw,
            size_normalized: row.size_normalized,
            width: row.width,
            aspect_ratio: row.aspect_ratio,
            rim_diameter: row.rim_diameter,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert model for `tire_sizes`.
#[derive(Debug, Insertable)]
#[diesel(table_name = tire_sizes)]
pub struct NewTireSizeRow<'a> {
    pub id: Uuid,
    pub size_raw: &'a str,
    pub size_normalized: &'a str,
    pub width: i32,
    pub aspect_ratio: i32,
    pub rim_diameter: i32,
}

impl<'a> NewTireSizeRow<'a> {
    /// Build an insert row from parsed components with a fresh id.
    #[must_use]
    pub fn from_components(components: &'a SizeComponents) -> Self {
        Self {
            id: Uuid::new_v4(),
            size_raw: components.size_raw.as_str(),
            size_normalized: components.size_normalized.as_str(),
            width: components.width,
            aspect_ratio: components.aspect_ratio,
            rim_diameter: components.rim_diameter,
        }
    }
}

/// Read model for `tire_codes`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tire_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TireCodeRow {
    pub id: Uuid,
    pub code_public: String,
    pub tire_size_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TireCodeRow> for TireCode {
    fn from(row: TireCodeRow) -> Self {
        Self {
            id: row.id,
            code_public: row.code_public,
            tire_size_id: row.tire_size_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Insert model for `tire_codes`.
#[derive(Debug, Insertable)]
#[diesel(table_name = tire_codes)]
pub struct NewTireCodeRow<'a> {
    pub id: Uuid,
    pub code_public: &'a str,
    pub tire_size_id: Uuid,
}

/// Read model for `tire_variants`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tire_variants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TireVariantRow {
    pub id: Uuid,
    pub tire_size_id: Uuid,
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<TireVariantRow> for TireVariant {
    fn from(row: TireVariantRow) -> Self {
        Self {
            id: row.id,
            tire_size_id: row.tire_size_id,
            load_index: row.load_index,
            speed_index: row.speed_index,
            created_at: row.created_at,
        }
    }
}

/// Insert model for `tire_variants`.
#[derive(Debug, Insertable)]
#[diesel(table_name = tire_variants)]
pub struct NewTireVariantRow<'a> {
    pub id: Uuid,
    pub tire_size_id: Uuid,
    pub load_index: Option<i32>,
    pub speed_index: Option<&'a str>,
}

/// Insert model for `search_logs`.
#[derive(Debug, Insertable)]
#[diesel(table_name = search_logs)]
pub struct NewSearchLogRow<'a> {
    pub id: Uuid,
    pub query: &'a str,
    pub query_type: &'a str,
    pub result_found: bool,
    pub ip_hash: Option<&'a str>,
}

/// Read model for `import_jobs`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = import_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ImportJobRow {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub state: String,
    pub attempts: i32,
    pub result: Option<serde_json::Value>,
    pub last_error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for `import_jobs`.
#[derive(Debug, Insertable)]
#[diesel(table_name = import_jobs)]
pub struct NewImportJobRow<'a> {
    pub id: Uuid,
    pub payload: &'a serde_json::Value,
    pub state: &'a str,
    pub attempts: i32,
    pub submitted_at: DateTime<Utc>,
}
