//! Resolution of the effective variant token for a lookup request.
//!
//! A variant can arrive three ways, in strict precedence order: explicit
//! load/speed-index parameters, a second whitespace-separated token inside
//! the code string (`"100 91V"`), or a trailing token after the size body
//! (`"205/55R16 91V"`). Contradictory half-pairs are rejected; absence of a
//! variant is not an error.

use std::sync::OnceLock;

use regex::Regex;

use super::error::Error;
use super::normalizer::parse_variant;
use super::tire::VariantSpec;

static TRAILING_VARIANT_RE: OnceLock<Regex> = OnceLock::new();

fn trailing_variant_pattern() -> &'static Regex {
    TRAILING_VARIANT_RE.get_or_init(|| {
        Regex::new(r"\s+(\d+[A-Za-z])\s*$")
            .unwrap_or_else(|error| panic!("trailing variant regex failed to compile: {error}"))
    })
}

/// Outcome of variant resolution: the (possibly truncated) lookup inputs and
/// the single effective variant, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLookupInput {
    pub code: Option<String>,
    pub size: Option<String>,
    pub variant: Option<VariantSpec>,
}

/// Determine the effective variant for a code- or size-lookup request.
///
/// Explicit parameters win over embedded tokens; an embedded code token wins
/// over a trailing size token. Extracted tokens are uppercased before
/// parsing.
///
/// # Errors
///
/// Returns an
/// [`ErrorCode::IncompleteVariantParams`](super::ErrorCode::IncompleteVariantParams)
/// error when exactly one of the explicit parameters is supplied, and
/// propagates variant-format failures from
/// [`parse_variant`](super::normalizer::parse_variant).
pub fn resolve_variant_input(
    code: Option<&str>,
    size: Option<&str>,
    load_index: Option<i32>,
    speed_index: Option<&str>,
) -> Result<ResolvedLookupInput, Error> {
    let mut resolved_code = code.map(str::trim).map(str::to_owned);
    let mut resolved_size = size.map(str::trim).map(str::to_owned);
    let mut token: Option<String> = None;

    if load_index.is_some() || speed_index.is_some() {
        let (Some(li), Some(si)) = (load_index, speed_index) else {
            return Err(Error::incomplete_variant_params(
                "Both \"li\" and \"si\" are required",
            ));
        };
        token = Some(format!("{li}{si}"));
    }

    if token.is_none() {
        if let Some(current) = resolved_code.as_deref() {
            let mut parts = current.split_whitespace();
            if let (Some(first), Some(second)) = (parts.next(), parts.next()) {
                token = Some(second.to_owned());
                resolved_code = Some(first.to_owned());
            }
        }
    }

    if token.is_none() {
        if let Some(current) = resolved_size.as_deref() {
            if let Some(captures) = trailing_variant_pattern().captures(current) {
                if let (Some(whole), Some(matched)) = (captures.get(0), captures.get(1)) {
                    token = Some(matched.as_str().to_owned());
                    resolved_size = current
                        .get(..whole.start())
                        .map(str::trim_end)
                        .map(str::to_owned);
                }
            }
        }
    }

    let variant = match token {
        Some(raw) => parse_variant(&raw.to_ascii_uppercase())?,
        None => None,
    };

    Ok(ResolvedLookupInput {
        code: resolved_code,
        size: resolved_size,
        variant,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    fn spec(load_index: i32, speed_index: &str) -> VariantSpec {
        VariantSpec {
            load_index,
            speed_index: speed_index.to_owned(),
        }
    }

    #[rstest]
    fn explicit_pair_takes_precedence_over_embedded_token() {
        let resolved = resolve_variant_input(Some("100 88H"), None, Some(91), Some("V"))
            .expect("resolves");

        assert_eq!(resolved.code.as_deref(), Some("100 88H"));
        assert_eq!(resolved.variant, Some(spec(91, "V")));
    }

    #[rstest]
    #[case(Some(91), None)]
    #[case(None, Some("V"))]
    fn half_explicit_pair_is_rejected(
        #[case] load_index: Option<i32>,
        #[case] speed_index: Option<&str>,
    ) {
        let error = resolve_variant_input(Some("100"), None, load_index, speed_index)
            .expect_err("half pair");
        assert_eq!(error.code(), ErrorCode::IncompleteVariantParams);
    }

    #[rstest]
    fn second_code_token_becomes_variant_and_truncates_code() {
        let resolved =
            resolve_variant_input(Some("  100  91v "), None, None, None).expect("resolves");

        assert_eq!(resolved.code.as_deref(), Some("100"));
        assert_eq!(resolved.variant, Some(spec(91, "V")));
    }

    #[rstest]
    fn trailing_size_token_is_extracted_and_stripped() {
        let resolved =
            resolve_variant_input(None, Some("205/55R16 91V"), None, None).expect("resolves");

        assert_eq!(resolved.size.as_deref(), Some("205/55R16"));
        assert_eq!(resolved.variant, Some(spec(91, "V")));
    }

    #[rstest]
    fn size_without_trailing_token_is_left_alone() {
        let resolved = resolve_variant_input(None, Some("205/55R16"), None, None)
            .expect("resolves");

        assert_eq!(resolved.size.as_deref(), Some("205/55R16"));
        assert_eq!(resolved.variant, None);
    }

    #[rstest]
    fn no_variant_anywhere_is_valid() {
        let resolved = resolve_variant_input(Some("100"), None, None, None).expect("resolves");
        assert_eq!(resolved.code.as_deref(), Some("100"));
        assert_eq!(resolved.variant, None);
    }

    #[rstest]
    fn malformed_embedded_token_is_rejected() {
        let error =
            resolve_variant_input(Some("100 91VW"), None, None, None).expect_err("bad token");
        assert_eq!(error.code(), ErrorCode::InvalidVariantFormat);
    }
}
