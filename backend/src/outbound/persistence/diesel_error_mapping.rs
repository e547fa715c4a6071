//! Shared Diesel error mapping for the catalog repositories.

use tracing::debug;

use super::pool::PoolError;

/// Map pool errors into a repository-specific connection error constructor.
pub fn map_pool_error<E, C>(error: PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    let message = match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    };
    connection(message)
}

/// Map common Diesel error variants into query/connection/duplicate-key
/// constructors.
///
/// Uniqueness violations get their own constructor so services can
/// distinguish race losers from plain query failures.
pub fn map_diesel_error<E, Q, C, D>(
    error: diesel::result::Error,
    query: Q,
    connection: C,
    duplicate: D,
) -> E
where
    Q: Fn(&'static str) -> E,
    C: Fn(&'static str) -> E,
    D: Fn(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => query("record not found"),
        DieselError::QueryBuilderError(_) => query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            duplicate(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error")
        }
        DieselError::DatabaseError(_, _) => query("database error"),
        _ => query("database error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CatalogRepositoryError;
    use rstest::rstest;

    fn map(error: diesel::result::Error) -> CatalogRepositoryError {
        map_diesel_error(
            error,
            CatalogRepositoryError::query,
            CatalogRepositoryError::connection,
            CatalogRepositoryError::duplicate_key,
        )
    }

    #[rstest]
    fn unique_violation_maps_to_duplicate_key() {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        let mapped = map(DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_owned()),
        ));

        assert!(
            matches!(mapped, CatalogRepositoryError::DuplicateKey { .. }),
            "expected DuplicateKey error, got {mapped:?}"
        );
    }

    #[rstest]
    fn not_found_maps_to_query_error() {
        let mapped = map(diesel::result::Error::NotFound);
        assert!(matches!(mapped, CatalogRepositoryError::Query { .. }));
    }

    #[rstest]
    fn pool_errors_map_to_connection() {
        let mapped: CatalogRepositoryError = map_pool_error(
            PoolError::checkout("timed out"),
            CatalogRepositoryError::connection,
        );
        assert!(mapped.to_string().contains("timed out"));
    }
}
