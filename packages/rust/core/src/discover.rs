//! Discovery stage: seed the run with agency identities.

use tracing::{info, instrument};

use leadgen_discovery::AgencyDirectory;
use leadgen_shared::{LeadGenError, LeadRecord, Result};

/// Search the directory and turn each candidate into a pending record.
///
/// This is the only stage whose failure aborts the run. An empty result is
/// an error too: no later stage can create identities.
#[instrument(skip_all, fields(country = %country, target_count = target_count))]
pub async fn discover_leads(
    directory: &AgencyDirectory,
    country: &str,
    query: &str,
    target_count: usize,
) -> Result<Vec<LeadRecord>> {
    let candidates = directory.discover(country, query, target_count).await?;
    if candidates.is_empty() {
        return Err(LeadGenError::Discovery(format!(
            "no agencies found for \"{query}\" in {country}"
        )));
    }

    let records: Vec<LeadRecord> = candidates
        .into_iter()
        .map(|c| LeadRecord::new(c.agency_name, c.website, c.country))
        .collect();
    info!(count = records.len(), "leads discovered");
    Ok(records)
}
