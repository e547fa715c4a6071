//! CSV bulk-import coordination.
//!
//! Validates uploaded CSV content into ordered row objects and submits them
//! as one deferred job. The coordinator never applies rows to the catalog;
//! that is the import worker's job. Identical uploads are never deduplicated
//! at this layer: every submission creates a new job.
//!
//! Row errors name the 1-based data-row number offset by the header, so the
//! first data row is row 2, matching what an operator sees in a spreadsheet.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::Error;
use super::ports::{ImportJobId, ImportJobPayload, ImportJobStatus, ImportQueue, ImportQueueError};

/// Header names are matched case-insensitively after trimming.
const SIZE_COLUMN: &str = "size";
const LOAD_INDEX_COLUMN: &str = "loadindex";
const SPEED_INDEX_COLUMN: &str = "speedindex";

/// One validated CSV row; `size` is still raw and is normalized when the
/// worker applies the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvRow {
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_index: Option<String>,
}

/// Parse CSV content into ordered row objects.
///
/// The `size` column is required per row; `loadIndex` and `speedIndex` are
/// optional. Empty lines are skipped by the reader.
///
/// # Errors
///
/// `MissingParameter` when the content has no data rows or a row lacks its
/// `size` value, and `InvalidFormat` when a present `loadIndex` is not
/// numeric; both name the offending row.
pub fn parse_rows(content: &str) -> Result<Vec<CsvRow>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| Error::invalid_format(format!("Malformed CSV header: {error}")))?
        .iter()
        .map(|header| header.trim().to_ascii_lowercase())
        .collect();
    let size_column = headers.iter().position(|header| header == SIZE_COLUMN);
    let load_index_column = headers
        .iter()
        .position(|header| header == LOAD_INDEX_COLUMN);
    let speed_index_column = headers
        .iter()
        .position(|header| header == SPEED_INDEX_COLUMN);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        // 1-based data rows, plus one for the header line.
        let row_number = index + 2;
        let record = record.map_err(|error| {
            Error::invalid_format(format!("Row {row_number}: malformed CSV record: {error}"))
        })?;

        let size = size_column
            .and_then(|column| record.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                Error::missing_parameter(format!(
                    "Row {row_number}: Missing \"size\" column value"
                ))
            })?;

        let load_index = load_index_column
            .and_then(|column| record.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| {
                value.parse::<i32>().map_err(|_| {
                    Error::invalid_format(format!("Row {row_number}: Invalid loadIndex"))
                })
            })
            .transpose()?;
        let speed_index = speed_index_column
            .and_then(|column| record.get(column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);

        rows.push(CsvRow {
            size: size.to_owned(),
            load_index,
            speed_index,
        });
    }

    if rows.is_empty() {
        return Err(Error::missing_parameter(
            "CSV must contain at least a header and one data row",
        ));
    }

    Ok(rows)
}

/// Bulk-import coordination over the import queue.
#[derive(Clone)]
pub struct CsvImportService<Q> {
    queue: Arc<Q>,
}

impl<Q> CsvImportService<Q> {
    /// Create a new coordinator over the given queue.
    pub fn new(queue: Arc<Q>) -> Self {
        Self { queue }
    }
}

impl<Q> CsvImportService<Q>
where
    Q: ImportQueue,
{
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

    /// Validate CSV content and submit it as one deferred job.
    ///
    /// # Errors
    ///
    /// Propagates [`parse_rows`] failures and queue submission errors.
    pub async fn submit(&self, content: &str) -> Result<ImportJobId, Error> {
        let rows = parse_rows(content)?;
        info!(rows = rows.len(), "submitting CSV import job");

        let payload = ImportJobPayload {
            rows,
            submitted_at: Utc::now(),
        };
        let id = self
            .queue
            .submit(&payload)
            .await
            .map_err(Self::map_queue_error)?;
        debug!(job = %id, "CSV import job queued");
        Ok(id)
    }

    /// Snapshot a job's state.
    ///
    /// # Errors
    ///
    /// `NotFound` when the id is unknown.
    pub async fn job_status(&self, id: ImportJobId) -> Result<ImportJobStatus, Error> {
        self.queue
            .status(id)
            .await
            .map_err(Self::map_queue_error)?
            .ok_or_else(|| Error::not_found(format!("Import job \"{id}\" not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockImportQueue;
    use rstest::rstest;

    #[rstest]
    fn parses_rows_with_optional_columns() {
        let content = "size,loadIndex,speedIndex\n205/55R16,91,V\n195/65R15,,\n";
        let rows = parse_rows(content).expect("valid csv");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().map(|row| row.size.as_str()), Some("205/55R16"));
        assert_eq!(rows.first().and_then(|row| row.load_index), Some(91));
        assert_eq!(
            rows.first().and_then(|row| row.speed_index.as_deref()),
            Some("V")
        );
        assert_eq!(rows.get(1).and_then(|row| row.load_index), None);
        assert_eq!(rows.get(1).and_then(|row| row.speed_index.clone()), None);
    }

    #[rstest]
    fn header_matching_is_case_insensitive_and_trimmed() {
        let content = " SIZE , LOADINDEX \n205/55R16,91\n";
        let rows = parse_rows(content).expect("valid csv");
        assert_eq!(rows.first().and_then(|row| row.load_index), Some(91));
    }

    #[rstest]
    fn missing_size_value_names_the_row() {
        let content = "size,loadIndex\n205/55R16,91\n,88\n";
        let error = parse_rows(content).expect_err("missing size");

        assert_eq!(error.code(), ErrorCode::MissingParameter);
        assert!(error.message().contains("Row 3"), "got: {}", error.message());
    }

    #[rstest]
    fn non_numeric_load_index_names_the_row() {
        let content = "size,loadIndex\n205/55R16,heavy\n";
        let error = parse_rows(content).expect_err("bad loadIndex");

        assert_eq!(error.code(), ErrorCode::InvalidFormat);
        assert!(error.message().contains("Row 2"), "got: {}", error.message());
    }

    #[rstest]
    #[case("")]
    #[case("size,loadIndex\n")]
    fn content_without_data_rows_is_rejected(#[case] content: &str) {
        let error = parse_rows(content).expect_err("no data rows");
        assert_eq!(error.code(), ErrorCode::MissingParameter);
    }

    #[rstest]
    fn rows_preserve_input_order() {
        let content = "size\n205/55R16\n195/65R15\n215/60R16\n";
        let rows = parse_rows(content).expect("valid csv");
        let sizes: Vec<&str> = rows.iter().map(|row| row.size.as_str()).collect();
        assert_eq!(sizes, vec!["205/55R16", "195/65R15", "215/60R16"]);
    }

    #[tokio::test]
    async fn submit_queues_one_job_per_upload() {
        let mut queue = MockImportQueue::new();
        queue
            .expect_submit()
            .withf(|payload| payload.rows.len() == 1)
            .times(2)
            .returning(|_| Ok(ImportJobId::random()));

        let svc = CsvImportService::new(Arc::new(queue));
        let content = "size\n205/55R16\n";

        let first = svc.submit(content).await.expect("first submission");
        let second = svc.submit(content).await.expect("second submission");
        assert_ne!(first, second, "identical uploads must create distinct jobs");
    }

    #[tokio::test]
    async fn unknown_job_id_is_not_found() {
        let mut queue = MockImportQueue::new();
        queue.expect_status().returning(|_| Ok(None));

        let svc = CsvImportService::new(Arc::new(queue));
        let error = svc
            .job_status(ImportJobId::random())
            .await
            .expect_err("unknown job");
        assert_eq!(error.code(), ErrorCode::NotFound);
    }
}
