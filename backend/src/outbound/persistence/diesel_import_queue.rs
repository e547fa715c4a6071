//! PostgreSQL-backed `ImportQueue` implementation using Diesel ORM.
//!
//! Jobs live in the `import_jobs` table. Workers claim the oldest queued
//! job inside a transaction with `FOR UPDATE SKIP LOCKED`, so concurrent
//! workers never double-claim and at-least-once delivery falls out of the
//! requeue-on-failure path.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{
    ClaimedImportJob, ImportJobId, ImportJobPayload, ImportJobState, ImportJobStatus, ImportQueue,
    ImportQueueError, ImportSummary,
};

use super::pool::DbPool;
use super::schema::import_jobs;

/// Diesel-backed implementation of the `ImportQueue` port.
#[derive(Clone)]
pub struct DieselImportQueue {
    pool: DbPool,
}

impl DieselImportQueue {
    /// Create a new queue with the given connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: diesel::result::Error) -> ImportQueueError {
    ImportQueueError::backend(error.to_string())
}

fn decode_payload(value: serde_json::Value) -> Result<ImportJobPayload, ImportQueueError> {
    serde_json::from_value(value).map_err(|error| ImportQueueError::serialization(error.to_string()))
}

fn decode_state(value: &str) -> ImportJobState {
    ImportJobState::parse(value).unwrap_or(ImportJobState::Failed)
}

#[async_trait]
impl ImportQueue for DieselImportQueue {
    async fn submit(&self, payload: &ImportJobPayload) -> Result<ImportJobId, ImportQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| ImportQueueError::backend(error.to_string()))?;

        let encoded = serde_json::to_value(payload)
            .map_err(|error| ImportQueueError::serialization(error.to_string()))?;
        let id = Uuid::new_v4();

        diesel::insert_into(import_jobs::table)
            .values(super::models::NewImportJobRow {
                id,
                payload: &encoded,
                state: ImportJobState::Queued.as_str(),
                attempts: 0,
                submitted_at: payload.submitted_at,
            })
            .execute(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(ImportJobId::from_uuid(id))
    }

    async fn status(&self, id: ImportJobId) -> Result<Option<ImportJobStatus>, ImportQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| ImportQueueError::backend(error.to_string()))?;

        let row: Option<super::models::ImportJobRow> = import_jobs::table
            .find(*id.as_uuid())
            .select(super::models::ImportJobRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let result: Option<ImportSummary> = row
            .result
            .map(serde_json::from_value)
            .transpose()
            .map_err(|error| ImportQueueError::serialization(error.to_string()))?;

        Ok(Some(ImportJobStatus {
            id,
            state: decode_state(&row.state),
            attempts: row.attempts,
            result,
            last_error: row.last_error,
            submitted_at: row.submitted_at,
        }))
    }

    async fn claim_next(&self) -> Result<Option<ClaimedImportJob>, ImportQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| ImportQueueError::backend(error.to_string()))?;

        let claimed: Option<super::models::ImportJobRow> = conn
            .transaction(|conn| {
                async move {
                    let row: Option<super::models::ImportJobRow> = import_jobs::table
                        .filter(import_jobs::state.eq(ImportJobState::Queued.as_str()))
                        .order(import_jobs::submitted_at.asc())
                        .limit(1)
                        .select(super::models::ImportJobRow::as_select())
                        .for_update()
                        .skip_locked()
                        .first(conn)
                        .await
                        .optional()?;

                    let Some(row) = row else {
                        return Ok(None);
                    };

                    let attempts = row.attempts + 1;
                    diesel::update(import_jobs::table.find(row.id))
                        .set((
                            import_jobs::state.eq(ImportJobState::Running.as_str()),
                            import_jobs::attempts.eq(attempts),
                            import_jobs::updated_at.eq(Utc::now()),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(Some(super::models::ImportJobRow { attempts, ..row }))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_error)?;

        claimed
            .map(|row| {
                Ok(ClaimedImportJob {
                    id: ImportJobId::from_uuid(row.id),
                    payload: decode_payload(row.payload)?,
                    attempts: row.attempts,
                })
            })
            .transpose()
    }

    async fn mark_completed(
        &self,
        id: ImportJobId,
        summary: &ImportSummary,
    ) -> Result<(), ImportQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|error| ImportQueueError::backend(error.to_string()))?;

        let encoded = serde_json::to_value(summary)
            .map_err(|error| ImportQueueError::serialization(error.to_string()))?;
        diesel::update(import_jobs::table.find(*id.as_uuid()))
            .set((
                import_jobs::state.eq(ImportJobState::Completed.as_str()),
                import_jobs::result.eq(Some(encoded)),
                import_jobs::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(())
    }

    async fn mark_failed(
        &self,
        id: ImportJobId,
        error: &str,
        retry: bool,
    ) -> Result<(), ImportQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|pool_error| ImportQueueError::backend(pool_error.to_string()))?;

        let next_state = if retry {
            ImportJobState::Queued
        } else {
            ImportJobState::Failed
        };
        diesel::update(import_jobs::table.find(*id.as_uuid()))
            .set((
                import_jobs::state.eq(next_state.as_str()),
                import_jobs::last_error.eq(Some(error)),
                import_jobs::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn unknown_persisted_state_degrades_to_failed() {
        assert_eq!(decode_state("paused"), ImportJobState::Failed);
        assert_eq!(decode_state("queued"), ImportJobState::Queued);
    }

    #[rstest]
    fn payload_decode_rejects_foreign_json() {
        let error = decode_payload(serde_json::json!({"rows": "not-a-list"}))
            .expect_err("malformed payload");
        assert!(matches!(error, ImportQueueError::Serialization { .. }));
    }
}
