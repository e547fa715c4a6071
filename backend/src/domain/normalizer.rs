//! Tire-size normalization and variant-token parsing.
//!
//! The canonical size form is `NNN/NNRNN`: a 3-digit section width, a
//! 2-digit aspect ratio, the literal rim designator `R`, and a 2-digit rim
//! diameter. Normalization strips all whitespace and upper-cases the rim
//! designator before validating; anything else (decimals, reversed order,
//! missing separators, trailing punctuation) is rejected outright.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::Error;
use super::tire::VariantSpec;

/// Example size format quoted in error messages.
pub const SIZE_FORMAT_EXAMPLE: &str = "205/55R16";
/// Example variant format quoted in error messages.
pub const VARIANT_FORMAT_EXAMPLE: &str = "91V";

static SIZE_RE: OnceLock<Regex> = OnceLock::new();
static VARIANT_RE: OnceLock<Regex> = OnceLock::new();

fn size_pattern() -> &'static Regex {
    SIZE_RE.get_or_init(|| {
        Regex::new(r"^(\d{3})/(\d{2})R(\d{2})$")
            .unwrap_or_else(|error| panic!("size regex failed to compile: {error}"))
    })
}

fn variant_pattern() -> &'static Regex {
    VARIANT_RE.get_or_init(|| {
        Regex::new(r"^(\d+)([A-Z])$")
            .unwrap_or_else(|error| panic!("variant regex failed to compile: {error}"))
    })
}

fn invalid_size_error() -> Error {
    Error::invalid_format(format!(
        "Invalid tire size format. Expected: {SIZE_FORMAT_EXAMPLE}"
    ))
}

fn invalid_variant_error() -> Error {
    Error::invalid_variant_format(format!(
        "Invalid variant format. Expected: {VARIANT_FORMAT_EXAMPLE} (number + single letter)"
    ))
}

/// Parsed components of a valid tire size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeComponents {
    /// Trimmed original input, spacing and case preserved for audit.
    pub size_raw: String,
    /// Canonical `NNN/NNRNN` form.
    pub size_normalized: String,
    pub width: i32,
    pub aspect_ratio: i32,
    pub rim_diameter: i32,
}

/// Normalize a raw tire-size string into canonical form.
///
/// Whitespace may appear anywhere between tokens (tabs, repeated spaces);
/// all of it is stripped, the rim designator is forced to uppercase, and the
/// result must match `NNN/NNRNN` exactly.
///
/// # Errors
///
/// Returns an [`ErrorCode::InvalidFormat`](super::ErrorCode::InvalidFormat)
/// error when the stripped input does not match, including empty input.
pub fn normalize(input: &str) -> Result<String, Error> {
    let stripped: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if stripped.is_empty() {
        return Err(invalid_size_error());
    }

    // Digits and separators are unaffected; this only lifts the rim `r`.
    let normalized = stripped.to_ascii_uppercase();
    if !size_pattern().is_match(&normalized) {
        return Err(invalid_size_error());
    }

    Ok(normalized)
}

/// Normalize a size and extract its numeric components.
///
/// # Errors
///
/// Propagates [`normalize`] failures for malformed input.
pub fn parse_size_components(size_raw: &str) -> Result<SizeComponents, Error> {
    let normalized = normalize(size_raw)?;
    let captures = size_pattern()
        .captures(&normalized)
        .ok_or_else(invalid_size_error)?;

    Ok(SizeComponents {
        size_raw: size_raw.trim().to_owned(),
        size_normalized: normalized.clone(),
        width: capture_as_i32(&captures, 1)?,
        aspect_ratio: capture_as_i32(&captures, 2)?,
        rim_diameter: capture_as_i32(&captures, 3)?,
    })
}

fn capture_as_i32(captures: &regex::Captures<'_>, group: usize) -> Result<i32, Error> {
    captures
        .get(group)
        .ok_or_else(invalid_size_error)?
        .as_str()
        .parse::<i32>()
        .map_err(|error| Error::internal(format!("size component out of range: {error}")))
}

/// Parse a load/speed-index token such as `"91V"`.
///
/// Absence of a variant is valid: empty (or whitespace-only) input yields
/// `Ok(None)`, not an error. Matching is case-insensitive; a single trailing
/// letter is required, so multi-letter suffixes like `"91VW"` are rejected.
///
/// # Errors
///
/// Returns an
/// [`ErrorCode::InvalidVariantFormat`](super::ErrorCode::InvalidVariantFormat)
/// error for non-empty input that is not digits followed by one letter.
pub fn parse_variant(input: &str) -> Result<Option<VariantSpec>, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let token = trimmed.to_ascii_uppercase();
    let captures = variant_pattern()
        .captures(&token)
        .ok_or_else(invalid_variant_error)?;

    let load_index = captures
        .get(1)
        .ok_or_else(invalid_variant_error)?
        .as_str()
        .parse::<i32>()
        .map_err(|_| invalid_variant_error())?;
    let speed_index = captures
        .get(2)
        .ok_or_else(invalid_variant_error)?
        .as_str()
        .to_owned();

    Ok(Some(VariantSpec {
        load_index,
        speed_index,
    }))
}
