//! Port for public tire-code issuance.
//!
//! Codes are short numeric strings drawn from a shared sequence, unique at
//! the moment of assignment. A concurrent assignment race still loses at the
//! store's uniqueness constraint, which the mapping service translates into
//! a conflict; retry is the caller's concern, not the issuer's.

use async_trait::async_trait;

/// Errors raised by code-issuer adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeIssuerError {
    /// The issuing backend is unavailable or the allocation failed.
    #[error("code issuance failed: {message}")]
    Backend { message: String },
}

impl CodeIssuerError {
    /// Create a backend error with the given message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Port allocating the next public code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CodeIssuer: Send + Sync {
    /// Allocate and return the next unused public code.
    async fn next_code(&self) -> Result<String, CodeIssuerError>;
}

/// Fixture issuer that always returns the same code. Use it where issuance
/// is not under test.
#[derive(Debug, Clone, Default)]
pub struct FixtureCodeIssuer {
    code: String,
}

impl FixtureCodeIssuer {
    /// Issue `code` on every call.
    pub fn returning(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

#[async_trait]
impl CodeIssuer for FixtureCodeIssuer {
    async fn next_code(&self) -> Result<String, CodeIssuerError> {
        Ok(self.code.clone())
    }
}
