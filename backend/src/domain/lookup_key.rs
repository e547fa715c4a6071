//! Cache key type shared by lookup cache adapters.
//!
//! Keys are deterministic in the lookup axis, the normalized identifier, and
//! the variant qualifier: `lookup:code:100:91V` or `lookup:size:205/55R16:base`.
//! Per-axis prefixes support invalidating every qualifier of a mapping at
//! once after an admin mutation.

use thiserror::Error;

use super::tire::VariantSpec;

const BASE_QUALIFIER: &str = "base";

/// Cache key used to store and retrieve lookup responses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupCacheKey(String);

impl LookupCacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, LookupCacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(LookupCacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(LookupCacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Key for a code-axis lookup, qualified by the requested variant.
    #[must_use]
    pub fn for_code(code: &str, variant: Option<&VariantSpec>) -> Self {
        Self(format!("{}{}", Self::code_prefix(code), qualifier(variant)))
    }

    /// Key for a size-axis lookup, qualified by the requested variant.
    #[must_use]
    pub fn for_size(size_normalized: &str, variant: Option<&VariantSpec>) -> Self {
        Self(format!(
            "{}{}",
            Self::size_prefix(size_normalized),
            qualifier(variant)
        ))
    }

    /// Prefix covering every qualifier cached for a public code.
    #[must_use]
    pub fn code_prefix(code: &str) -> String {
        format!("lookup:code:{code}:")
    }

    /// Prefix covering every qualifier cached for a normalized size.
    #[must_use]
    pub fn size_prefix(size_normalized: &str) -> String {
        format!("lookup:size:{size_normalized}:")
    }

    /// Borrow the underlying key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn qualifier(variant: Option<&VariantSpec>) -> String {
    variant.map_or_else(|| BASE_QUALIFIER.to_owned(), VariantSpec::token)
}

impl std::fmt::Display for LookupCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for LookupCacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`LookupCacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupCacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("lookup cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("lookup cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}
