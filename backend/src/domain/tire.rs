//! Catalog entities: tire sizes, public codes, and rating variants.
//!
//! `TireSize.size_normalized` is always derivable from `size_raw` via
//! [`crate::domain::normalizer::normalize`]; the raw form is retained for
//! audit purposes only. A `TireCode` maps 1:1 to its `TireSize`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalogued tire size with its parsed components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TireSize {
    pub id: Uuid,
    /// Original (trimmed) input, preserving spacing and case.
    pub size_raw: String,
    /// Canonical `NNN/NNRNN` form; unique across the catalog.
    pub size_normalized: String,
    pub width: i32,
    pub aspect_ratio: i32,
    pub rim_diameter: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public short code mapped 1:1 to a tire size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TireCode {
    pub id: Uuid,
    /// Public identifier; unique across the catalog.
    pub code_public: String,
    /// Owning size; unique, making the relationship 1:1.
    pub tire_size_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Load/speed-index rating attached to a tire size.
///
/// Variants are immutable once created; there is no update or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TireVariant {
    pub id: Uuid,
    pub tire_size_id: Uuid,
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A fully parsed load/speed-index pair, as extracted from a query token
/// such as `"91V"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSpec {
    pub load_index: i32,
    pub speed_index: String,
}

impl VariantSpec {
    /// Compact token form, e.g. `91V`, as used in cache keys.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{}{}", self.load_index, self.speed_index)
    }

    /// True when `variant` carries exactly this load and speed index.
    #[must_use]
    pub fn matches(&self, variant: &TireVariant) -> bool {
        variant.load_index == Some(self.load_index)
            && variant.speed_index.as_deref() == Some(self.speed_index.as_str())
    }
}

/// Variant fields as embedded in lookup responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSummary {
    pub load_index: Option<i32>,
    pub speed_index: Option<String>,
}

impl From<&TireVariant> for VariantSummary {
    fn from(variant: &TireVariant) -> Self {
        Self {
            load_index: variant.load_index,
            speed_index: variant.speed_index.clone(),
        }
    }
}

impl From<&VariantSpec> for VariantSummary {
    fn from(spec: &VariantSpec) -> Self {
        Self {
            load_index: Some(spec.load_index),
            speed_index: Some(spec.speed_index.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn variant(load_index: Option<i32>, speed_index: Option<&str>) -> TireVariant {
        TireVariant {
            id: Uuid::new_v4(),
            tire_size_id: Uuid::new_v4(),
            load_index,
            speed_index: speed_index.map(str::to_owned),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn spec_matches_exact_pair_only() {
        let spec = VariantSpec {
            load_index: 91,
            speed_index: "V".to_owned(),
        };

        assert!(spec.matches(&variant(Some(91), Some("V"))));
        assert!(!spec.matches(&variant(Some(99), Some("V"))));
        assert!(!spec.matches(&variant(Some(91), Some("H"))));
        assert!(!spec.matches(&variant(None, Some("V"))));
        assert!(!spec.matches(&variant(Some(91), None)));
    }

    #[rstest]
    fn spec_token_concatenates_pair() {
        let spec = VariantSpec {
            load_index: 91,
            speed_index: "V".to_owned(),
        };
        assert_eq!(spec.token(), "91V");
    }
}
