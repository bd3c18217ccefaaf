//! Export finalizer: score, flatten, and write to the sinks.

use std::fmt;

use tracing::{error, info, instrument};

use leadgen_shared::{ExportRow, LeadGenError, LeadRecord, LeadScore, Result};
use leadgen_sinks::RowSink;

/// Outcome of the optional secondary sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryStatus {
    NotConfigured,
    Success,
    Failed(String),
}

impl fmt::Display for SecondaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => f.write_str("not_configured"),
            Self::Success => f.write_str("success"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// What was exported and where.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub total: usize,
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub destination: String,
    pub secondary: SecondaryStatus,
    pub secondary_destination: Option<String>,
}

/// Score every record now, write the rows to `primary`, then try
/// `secondary`.
///
/// An empty record list is an error. A primary failure is returned as is;
/// a secondary failure is logged and reported in the summary only.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn export_records(
    records: &[LeadRecord],
    primary: &dyn RowSink,
    secondary: Option<&dyn RowSink>,
) -> Result<ExportSummary> {
    if records.is_empty() {
        return Err(LeadGenError::validation("cannot export an empty lead list"));
    }

    let rows: Vec<ExportRow> = records.iter().map(LeadRecord::to_row).collect();
    let count = |score: LeadScore| rows.iter().filter(|r| r.lead_score == score).count();

    primary.write_rows(&rows).await?;
    info!(destination = %primary.destination(), rows = rows.len(), "primary export written");

    let (status, secondary_destination) = match secondary {
        None => (SecondaryStatus::NotConfigured, None),
        Some(sink) => {
            let status = match sink.write_rows(&rows).await {
                Ok(()) => {
                    info!(destination = %sink.destination(), "secondary export written");
                    SecondaryStatus::Success
                }
                Err(e) => {
                    error!(destination = %sink.destination(), error = %e, "secondary export failed");
                    SecondaryStatus::Failed(e.to_string())
                }
            };
            (status, Some(sink.destination()))
        }
    };

    Ok(ExportSummary {
        total: rows.len(),
        hot: count(LeadScore::Hot),
        warm: count(LeadScore::Warm),
        cold: count(LeadScore::Cold),
        destination: primary.destination(),
        secondary: status,
        secondary_destination,
    })
}
