//! Domain-level error types.
//!
//! These errors are transport agnostic. An inbound adapter (HTTP, CLI, or
//! worker) maps them to whatever envelope its protocol requires; the domain
//! layer never encodes transport concerns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A tire-size string failed normalization.
    InvalidFormat,
    /// A load/speed-index token failed variant parsing.
    InvalidVariantFormat,
    /// A required parameter is absent or blank.
    MissingParameter,
    /// Exactly one half of a load/speed-index pair was supplied.
    IncompleteVariantParams,
    /// A uniqueness constraint on a code or size was violated.
    Conflict,
    /// The requested mapping, job, or id does not exist.
    NotFound,
    /// A code/size pairing is broken; signals corrupted state, not user error.
    DataIntegrity,
    /// A collaborator (store, cache) could not be reached.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// # Examples
/// ```
/// use backend::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl Error {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary structured details for adapters.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidFormat`].
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFormat, message)
    }

    /// Convenience constructor for [`ErrorCode::InvalidVariantFormat`].
    pub fn invalid_variant_format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidVariantFormat, message)
    }

    /// Convenience constructor for [`ErrorCode::MissingParameter`].
    pub fn missing_parameter(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingParameter, message)
    }

    /// Convenience constructor for [`ErrorCode::IncompleteVariantParams`].
    pub fn incomplete_variant_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IncompleteVariantParams, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::DataIntegrity`].
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataIntegrity, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(Error::invalid_format("bad size"), ErrorCode::InvalidFormat)]
    #[case(Error::invalid_variant_format("bad variant"), ErrorCode::InvalidVariantFormat)]
    #[case(Error::missing_parameter("missing"), ErrorCode::MissingParameter)]
    #[case(Error::incomplete_variant_params("half a pair"), ErrorCode::IncompleteVariantParams)]
    #[case(Error::conflict("taken"), ErrorCode::Conflict)]
    #[case(Error::not_found("missing"), ErrorCode::NotFound)]
    #[case(Error::data_integrity("broken pairing"), ErrorCode::DataIntegrity)]
    #[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
    #[case(Error::internal("boom"), ErrorCode::InternalError)]
    fn constructors_set_expected_code(#[case] error: Error, #[case] code: ErrorCode) {
        assert_eq!(error.code(), code);
    }

    #[rstest]
    fn details_round_trip_through_serde() {
        let error = Error::conflict("size already mapped")
            .with_details(json!({ "sizeNormalized": "205/55R16" }));

        let encoded = serde_json::to_value(&error).expect("serializes");
        let decoded: Error = serde_json::from_value(encoded).expect("deserializes");

        assert_eq!(decoded, error);
        assert_eq!(decoded.message(), "size already mapped");
        assert!(decoded.details().is_some());
    }

    #[rstest]
    fn error_codes_serialize_snake_case() {
        let encoded = serde_json::to_value(ErrorCode::IncompleteVariantParams).expect("serializes");
        assert_eq!(encoded, json!("incomplete_variant_params"));
    }
}
