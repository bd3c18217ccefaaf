use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, instrument, warn};

use leadgen_shared::{LeadGenError, Result};

use crate::source::{AgencyCandidate, AgencySource};

/// Pause between consecutive directory sources.
const DEFAULT_SOURCE_PAUSE: Duration = Duration::from_secs(2);

/// Queries every configured [`AgencySource`] and merges the results.
pub struct AgencyDirectory {
    sources: Vec<Box<dyn AgencySource>>,
    pause: Duration,
}

impl AgencyDirectory {
    pub fn new(sources: Vec<Box<dyn AgencySource>>) -> Self {
        Self {
            sources,
            pause: DEFAULT_SOURCE_PAUSE,
        }
    }

    /// Override the pause between sources.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Search all sources, then drop candidates missing a name or website,
    /// dedupe by exact website (first wins), and keep at most `target_count`.
    ///
    /// A failing source is logged and skipped. Only when every source fails
    /// is the result an error.
    #[instrument(skip_all, fields(country = %country, target_count = target_count))]
    pub async fn discover(
        &self,
        country: &str,
        query: &str,
        target_count: usize,
    ) -> Result<Vec<AgencyCandidate>> {
        let mut collected = Vec::new();
        let mut failures = Vec::new();

        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            match source.search(country, query, target_count).await {
                Ok(found) => {
                    info!(source = source.name(), count = found.len(), "source searched");
                    collected.extend(found);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "source failed, skipping");
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }

        if !self.sources.is_empty() && failures.len() == self.sources.len() {
            return Err(LeadGenError::Discovery(format!(
                "every directory source failed ({})",
                failures.join("; ")
            )));
        }

        let agencies = merge(collected, target_count);
        info!(count = agencies.len(), "discovery merged");
        Ok(agencies)
    }
}

fn merge(candidates: Vec<AgencyCandidate>, target_count: usize) -> Vec<AgencyCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| !c.agency_name.trim().is_empty() && !c.website.trim().is_empty())
        .filter(|c| seen.insert(c.website.clone()))
        .take(target_count)
        .collect()
}
