//! Background processor for queued CSV import jobs.
//!
//! Applies each job's rows through the mapping service. Rows whose size is
//! already mapped are skipped (the queue is at-least-once, so replays are
//! normal); rows with bad data are recorded and skipped, since retrying
//! cannot fix them. Infrastructure failures abort the run and requeue the
//! job until its attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::domain::Error;
use crate::domain::ErrorCode;
use crate::domain::mapping_service::{CreateMappingRequest, MappingService};
use crate::domain::ports::{
    CatalogRepository, ClaimedImportJob, CodeIssuer, ImportQueue, ImportQueueError, ImportSummary,
    LookupCache,
};

/// Attempts granted to a job before it is parked as failed.
pub const MAX_ATTEMPTS: i32 = 3;

/// Outcome of applying one claimed job.
enum RunOutcome {
    Completed(ImportSummary),
    Aborted(Error),
}

/// Worker loop claiming and applying import jobs.
pub struct ImportWorker<Q, C, K, G> {
    queue: Arc<Q>,
    mappings: Arc<MappingService<C, K, G>>,
    poll_interval: Duration,
}

impl<Q, C, K, G> ImportWorker<Q, C, K, G>
where
    Q: ImportQueue,
    C: CatalogRepository,
    K: LookupCache,
    G: CodeIssuer,
{
    /// Create a worker with the given queue, mapping service, and idle poll
    /// interval.
    pub fn new(
        queue: Arc<Q>,
        mappings: Arc<MappingService<C, K, G>>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            mappings,
            poll_interval,
        }
    }

    fn map_queue_error(error: ImportQueueError) -> Error {
        match error {
            ImportQueueError::Backend { message } => {
                Error::service_unavailable(format!("import queue unavailable: {message}"))
            }
            ImportQueueError::Serialization { message } => {
                Error::internal(format!("import job serialisation failed: {message}"))
            }
        }
    }

    /// True when the error means the row itself is unusable, as opposed to
    /// the infrastructure being unavailable.
    fn is_row_error(code: ErrorCode) -> bool {
        matches!(
            code,
            ErrorCode::InvalidFormat
                | ErrorCode::InvalidVariantFormat
                | ErrorCode::MissingParameter
                | ErrorCode::IncompleteVariantParams
        )
    }

    async fn apply_rows(&self, job: &ClaimedImportJob) -> RunOutcome {
        let mut summary = ImportSummary::default();

        for (index, row) in job.payload.rows.iter().enumerate() {
            let request = CreateMappingRequest {
                size_raw: row.size.clone(),
                load_index: row.load_index,
                speed_index: row.speed_index.clone(),
            };
            match self.mappings.create(request).await {
                Ok(record) => {
                    debug!(job = %job.id, code = %record.code_public, size = %record.size_normalized, "row applied");
                    summary.created += 1;
                }
                Err(err) if err.code() == ErrorCode::Conflict => {
                    debug!(job = %job.id, size = %row.size, "row already mapped, skipping");
                    summary.skipped += 1;
                }
                Err(err) if Self::is_row_error(err.code()) => {
                    warn!(job = %job.id, size = %row.size, error = %err, "unusable row, skipping");
                    summary.skipped += 1;
                    summary
                        .row_errors
                        .push(format!("row {}: {err}", index + 1));
                }
                Err(err) => return RunOutcome::Aborted(err),
            }
        }

        RunOutcome::Completed(summary)
    }

    /// Claim and apply at most one job.
    ///
    /// Returns `Ok(true)` when a job was processed (successfully or not) and
    /// `Ok(false)` when the queue was empty.
    ///
    /// # Errors
    ///
    /// Surfaces queue claim/bookkeeping failures; job application failures
    /// are recorded on the job instead.
    pub async fn run_once(&self) -> Result<bool, Error> {
        let Some(job) = self
            .queue
            .claim_next()
            .await
            .map_err(Self::map_queue_error)?
        else {
            return Ok(false);
        };
        info!(job = %job.id, rows = job.payload.rows.len(), attempt = job.attempts, "processing import job");

        match self.apply_rows(&job).await {
            RunOutcome::Completed(summary) => {
                info!(job = %job.id, created = summary.created, skipped = summary.skipped, "import job completed");
                self.queue
                    .mark_completed(job.id, &summary)
                    .await
                    .map_err(Self::map_queue_error)?;
            }
            RunOutcome::Aborted(err) => {
                let retry = job.attempts < MAX_ATTEMPTS;
                warn!(job = %job.id, error = %err, retry, "import job aborted");
                self.queue
                    .mark_failed(job.id, err.message(), retry)
                    .await
                    .map_err(Self::map_queue_error)?;
            }
        }

        Ok(true)
    }

    /// Run until cancelled, sleeping the poll interval while idle.
    pub async fn run(&self) {
        info!(poll = ?self.poll_interval, "import worker started");
        loop {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(err) => {
                    error!(error = %err, "import worker iteration failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
