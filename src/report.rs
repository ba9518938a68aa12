//! JSON batch reports.
//!
//! A harvest run can record what happened to every identifier: already
//! cached, freshly fetched, failed (with the reason), or cancelled before it
//! was attempted. The report is the caller-facing ledger; the store itself
//! stays metadata-free.

use serde::Serialize;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::controller::Retrieved;
use crate::error::HarvestError;

/// What happened to one identifier during a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Cached,
    Fetched,
    Failed,
    Cancelled,
}

#[derive(Debug, Serialize)]
pub struct ItemReport {
    pub identifier: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
}

/// Summary of a whole harvest run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// Date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// Local wall-clock time the report was assembled.
    pub local_time: String,
    pub total: usize,
    pub cached: usize,
    pub fetched: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    /// Build a report from [`crate::controller::get_all`] results.
    pub fn from_results(results: &[(String, Result<Retrieved, HarvestError>)]) -> Self {
        let now = chrono::Local::now();
        let mut report = BatchReport {
            local_date: now.date_naive().to_string(),
            local_time: now.time().to_string(),
            total: results.len(),
            cached: 0,
            fetched: 0,
            failed: 0,
            cancelled: 0,
            items: Vec::with_capacity(results.len()),
        };

        for (identifier, outcome) in results {
            let item = match outcome {
                Ok(retrieved) => {
                    let status = if retrieved.was_cached() {
                        report.cached += 1;
                        ItemStatus::Cached
                    } else {
                        report.fetched += 1;
                        ItemStatus::Fetched
                    };
                    ItemReport {
                        identifier: identifier.clone(),
                        status,
                        error: None,
                        bytes: Some(retrieved.content().len()),
                    }
                }
                Err(e) if e.is_cancelled() => {
                    report.cancelled += 1;
                    ItemReport {
                        identifier: identifier.clone(),
                        status: ItemStatus::Cancelled,
                        error: None,
                        bytes: None,
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    ItemReport {
                        identifier: identifier.clone(),
                        status: ItemStatus::Failed,
                        error: Some(e.to_string()),
                        bytes: None,
                    }
                }
            };
            report.items.push(item);
        }

        report
    }
}

/// Write a [`BatchReport`] as pretty-printed JSON.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn write_report(
    report: &BatchReport,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    if let Err(e) = fs::write(path, json).await {
        error!(path, error = %e, "Failed to write batch report");
        return Err(e.into());
    }
    info!(path, items = report.items.len(), "Wrote batch report");
    Ok(())
}
