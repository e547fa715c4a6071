//! Sequence-backed public code issuer.
//!
//! Codes are the decimal rendering of a dedicated PostgreSQL sequence
//! (`tire_code_numbers`, seeded to start at 100), so issuance is unique at
//! the moment of assignment without any application-level locking.

use async_trait::async_trait;
use diesel::sql_types::BigInt;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CodeIssuer, CodeIssuerError};

use super::pool::DbPool;

#[derive(Debug, diesel::QueryableByName)]
struct NextCodeNumber {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

/// Diesel-backed implementation of the `CodeIssuer` port.
#[derive(Clone)]
pub struct SequenceCodeIssuer {
    pool: DbPool,
}

impl SequenceCodeIssuer {
    /// Create a new issuer with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CodeIssuer for SequenceCodeIssuer {
    async fn next_code(&self) -> Result<String, CodeIssuerError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| CodeIssuerError::backend(error.to_string()))?;

        let row: NextCodeNumber =
            diesel::sql_query("SELECT nextval('tire_code_numbers') AS value")
                .get_result(&mut conn)
                .await
                .map_err(|error| CodeIssuerError::backend(error.to_string()))?;

        Ok(row.value.to_string())
    }
}
