//! End-to-end run: discover → enrich → contact → outreach → export.
//!
//! Stages run strictly one after another. Each stage receives the full
//! record list produced by the previous one and returns a list of the same
//! length and order.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use leadgen_crawler::PageFetcher;
use leadgen_discovery::AgencyDirectory;
use leadgen_shared::{ContactStatus, EnrichmentStatus, LeadRecord, PipelineConfig, Result, RunId};
use leadgen_sinks::RowSink;

use crate::contact::find_contacts;
use crate::discover::discover_leads;
use crate::enrichment::enrich_records;
use crate::export::{ExportSummary, export_records};
use crate::llm::TextGenerator;
use crate::outreach::write_outreach;

/// The capability providers a run talks to.
pub struct Collaborators<'a> {
    pub directory: &'a AgencyDirectory,
    pub fetcher: &'a dyn PageFetcher,
    pub generator: &'a dyn TextGenerator,
    pub primary: &'a dyn RowSink,
    pub secondary: Option<&'a dyn RowSink>,
}

/// Per-stage tallies taken from the final records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCounts {
    pub discovered: usize,
    pub enriched_complete: usize,
    pub contacts_found: usize,
    pub messages_generated: usize,
    pub over_limit: usize,
}

impl StageCounts {
    fn from_records(records: &[LeadRecord], max_words: usize) -> Self {
        Self {
            discovered: records.len(),
            enriched_complete: tally(records, |r| {
                r.enrichment_status == EnrichmentStatus::Complete
            }),
            contacts_found: tally(records, |r| r.contact_status == ContactStatus::Found),
            messages_generated: tally(records, |r| {
                r.outreach_message.as_deref().is_some_and(|m| !m.trim().is_empty())
            }),
            over_limit: tally(records, |r| r.message_length.is_some_and(|n| n > max_words)),
        }
    }
}

fn tally(records: &[LeadRecord], pred: impl Fn(&LeadRecord) -> bool) -> usize {
    records.iter().filter(|r| pred(r)).count()
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub counts: StageCounts,
    pub export: ExportSummary,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each record within a stage.
    fn record_done(&self, current: usize, total: usize, agency: &str);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn record_done(&self, _current: usize, _total: usize, _agency: &str) {}
    fn done(&self, _report: &RunReport) {}
}

/// Run all five stages.
///
/// Only discovery and the primary export can fail the run. Enrichment,
/// contact lookup and outreach absorb their failures into record status.
#[instrument(skip_all, fields(country = %config.target_country, target_count = config.target_count))]
pub async fn run_pipeline(
    config: &PipelineConfig,
    collaborators: &Collaborators<'_>,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    let run_id = RunId::new();
    let started_at = Utc::now();
    let start = Instant::now();
    info!(run_id = %run_id, "pipeline started");

    // --- Stage 1: Discovery ---
    progress.phase("Discovering agencies");
    let records = discover_leads(
        collaborators.directory,
        &config.target_country,
        &config.search_query,
        config.target_count,
    )
    .await?;

    // --- Stage 2: Enrichment ---
    progress.phase("Enriching agency profiles");
    let records = enrich_records(
        records,
        collaborators.fetcher,
        collaborators.generator,
        progress,
    )
    .await;

    // --- Stage 3: Contacts ---
    progress.phase("Finding decision-makers");
    let records = find_contacts(records, collaborators.fetcher, progress).await;

    // --- Stage 4: Outreach ---
    progress.phase("Writing outreach messages");
    let records = write_outreach(records, collaborators.generator, config.max_words, progress).await;

    // --- Stage 5: Export ---
    progress.phase("Exporting leads");
    let export = export_records(&records, collaborators.primary, collaborators.secondary).await?;

    let report = RunReport {
        run_id,
        started_at,
        elapsed: start.elapsed(),
        counts: StageCounts::from_records(&records, config.max_words),
        export,
    };
    progress.done(&report);

    info!(
        run_id = %report.run_id,
        leads = report.export.total,
        hot = report.export.hot,
        warm = report.export.warm,
        cold = report.export.cold,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "pipeline complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use leadgen_shared::{AppConfig, LeadGenError, LeadScore};
    use leadgen_sinks::CsvSink;

    use super::*;
    use crate::enrichment::ENRICHMENT_SYSTEM;
    use crate::export::SecondaryStatus;
    use crate::testing::{FakeFetcher, FakeGenerator, FixedSource, MemorySink};

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn record_done(&self, _current: usize, _total: usize, _agency: &str) {}
        fn done(&self, _report: &RunReport) {
            self.phases.lock().unwrap().push("done".into());
        }
    }

    fn config(target_count: usize) -> PipelineConfig {
        let mut config = PipelineConfig::from(&AppConfig::default());
        config.target_count = target_count;
        config
    }

    fn directory() -> AgencyDirectory {
        AgencyDirectory::new(vec![Box::new(FixedSource(vec![
            ("Alpha Social", "https://alpha.fi/"),
            ("Beta Media", "https://beta.fi/"),
            ("Gamma Growth", "https://gamma.fi/"),
            ("Delta Digital", "https://delta.fi/"),
        ]))])
        .with_pause(Duration::ZERO)
    }

    fn fetcher() -> FakeFetcher {
        FakeFetcher::default()
            .page(
                "https://alpha.fi/",
                "<p>Alpha Social runs paid social for retail brands. Founder Jane Doe: jane.doe@alpha.fi</p>",
            )
            .page("https://beta.fi/", "<p>Beta Media produces video.</p>")
            .page("https://gamma.fi/", "<p>Gamma Growth does SEO. Say hello@gamma.fi</p>")
    }

    fn generator() -> FakeGenerator {
        FakeGenerator::new(|req| {
            if req.system != ENRICHMENT_SYSTEM {
                return Ok("Hi, loved your recent work. Open to a 15-minute call next week?".into());
            }
            if req.prompt.contains("Beta Media") {
                Ok("Sorry, I cannot help with that.".into())
            } else {
                Ok(r#"{"services": ["Paid Social", "SEO"], "niche": "retail", "notes": "Team of 8"}"#.into())
            }
        })
    }

    #[tokio::test]
    async fn three_leads_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outputs").join("leads.csv");
        let (directory, fetcher, generator) = (directory(), fetcher(), generator());
        let primary = CsvSink::new(&path, false);
        let progress = RecordingProgress::default();

        let collaborators = Collaborators {
            directory: &directory,
            fetcher: &fetcher,
            generator: &generator,
            primary: &primary,
            secondary: None,
        };
        let report = run_pipeline(&config(3), &collaborators, &progress).await.unwrap();

        assert_eq!(
            report.counts,
            StageCounts {
                discovered: 3,
                enriched_complete: 2,
                contacts_found: 2,
                messages_generated: 3,
                over_limit: 0,
            }
        );
        assert_eq!((report.export.hot, report.export.warm, report.export.cold), (2, 0, 1));
        assert_eq!(report.export.secondary, SecondaryStatus::NotConfigured);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);

        let mut reader = csv::ReaderBuilder::new().from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][0], "Alpha Social");
        assert_eq!(&rows[0][6], "jane.doe@alpha.fi");
        assert_eq!(&rows[0][7], LeadScore::Hot.as_str());
        assert_eq!(&rows[1][0], "Beta Media");
        assert_eq!(&rows[1][3], "");
        assert_eq!(&rows[1][7], "Cold");
        assert_eq!(&rows[2][6], "hello@gamma.fi");
        assert_eq!(&rows[2][7], "Hot");

        let phases = progress.phases.lock().unwrap().clone();
        assert_eq!(phases.first().map(String::as_str), Some("Discovering agencies"));
        assert_eq!(phases.len(), 6);
    }

    #[tokio::test]
    async fn unavailable_generator_still_exports() {
        let (directory, fetcher) = (directory(), fetcher());
        let generator = FakeGenerator::new(|_| Err(LeadGenError::Unavailable("401".into())));
        let primary = MemorySink::default();

        let collaborators = Collaborators {
            directory: &directory,
            fetcher: &fetcher,
            generator: &generator,
            primary: &primary,
            secondary: None,
        };
        let report = run_pipeline(&config(2), &collaborators, &SilentProgress).await.unwrap();

        assert_eq!(report.counts.enriched_complete, 0);
        assert_eq!(report.counts.messages_generated, 0);
        assert_eq!(report.counts.contacts_found, 1);
        let rows = primary.written();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.lead_score == LeadScore::Cold));
    }

    #[tokio::test]
    async fn discovery_failure_aborts_before_export() {
        let directory =
            AgencyDirectory::new(vec![Box::new(FixedSource(vec![]))]).with_pause(Duration::ZERO);
        let (fetcher, generator) = (fetcher(), generator());
        let primary = MemorySink::default();

        let collaborators = Collaborators {
            directory: &directory,
            fetcher: &fetcher,
            generator: &generator,
            primary: &primary,
            secondary: None,
        };
        let err = run_pipeline(&config(3), &collaborators, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, LeadGenError::Discovery(_)));
        assert_eq!(generator.call_count(), 0);
        assert!(primary.written().is_empty());
    }
}
