//! Enrichment stage: services, niche, and size notes from each homepage.
//!
//! The generator is asked for a small JSON object. Its reply is parsed
//! strictly; anything that does not fit the expected shape leaves the
//! record `incomplete` instead of guessing.

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use leadgen_crawler::PageFetcher;
use leadgen_shared::{EnrichmentStatus, LeadGenError, LeadRecord, Result};

use crate::llm::{GenerationRequest, TextGenerator};
use crate::pipeline::ProgressReporter;

pub(crate) const ENRICHMENT_SYSTEM: &str = "You are a business intelligence analyst who \
specializes in marketing agencies. You read website copy, case studies and team pages and \
extract what services an agency offers, which industries it specializes in, and how large \
the operation is. Reply with JSON only.";

/// Fields extracted from one agency site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyProfile {
    pub services: String,
    pub niche: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceList {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawProfile {
    services: ServiceList,
    #[serde(default)]
    niche: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// Enrich every record in place order.
///
/// A failure for one record marks only that record `incomplete`. When the
/// generator is unavailable the rest of the stage degrades: the current and
/// every later record are marked `incomplete` and processing stops. Records
/// enriched before that keep their results.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn enrich_records(
    mut records: Vec<LeadRecord>,
    fetcher: &dyn PageFetcher,
    generator: &dyn TextGenerator,
    progress: &dyn ProgressReporter,
) -> Vec<LeadRecord> {
    let total = records.len();

    for i in 0..total {
        let outcome = enrich_one(&records[i], fetcher, generator).await;
        match outcome {
            Ok(profile) => {
                let record = &mut records[i];
                debug!(agency = %record.agency_name, services = %profile.services, "enriched");
                record.services = Some(profile.services);
                record.niche = profile.niche;
                record.notes = profile.notes;
                record.enrichment_status = EnrichmentStatus::Complete;
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, remaining = total - i, "enrichment unavailable, marking remaining records incomplete");
                let note = format!("Enrichment unavailable: {e}");
                for record in &mut records[i..] {
                    mark_incomplete(record, &note);
                }
                return records;
            }
            Err(e) => {
                let record = &mut records[i];
                warn!(agency = %record.agency_name, website = %record.website, error = %e, "enrichment failed");
                mark_incomplete(record, &format!("Enrichment failed: {e}"));
            }
        }
        progress.record_done(i + 1, total, &records[i].agency_name);
    }

    let complete = records
        .iter()
        .filter(|r| r.enrichment_status == EnrichmentStatus::Complete)
        .count();
    info!(complete, incomplete = total - complete, "enrichment finished");
    records
}

fn mark_incomplete(record: &mut LeadRecord, note: &str) {
    record.services = None;
    record.niche = None;
    record.notes = Some(note.to_string());
    record.enrichment_status = EnrichmentStatus::Incomplete;
}

async fn enrich_one(
    record: &LeadRecord,
    fetcher: &dyn PageFetcher,
    generator: &dyn TextGenerator,
) -> Result<AgencyProfile> {
    if !record.has_identity() {
        return Err(LeadGenError::validation("record is missing name, website or country"));
    }
    let url = Url::parse(record.website.trim())
        .map_err(|e| LeadGenError::parse(format!("invalid website URL: {e}")))?;
    let page = fetcher.fetch(&url).await?;
    if page.text.trim().is_empty() {
        return Err(LeadGenError::parse("homepage has no readable text"));
    }

    let request = GenerationRequest {
        system: ENRICHMENT_SYSTEM.to_string(),
        prompt: enrichment_prompt(record, &page.text),
    };
    let reply = generator.generate(&request).await?;
    parse_profile(&reply)
}

fn enrichment_prompt(record: &LeadRecord, page_text: &str) -> String {
    format!(
        "Agency: {name}\nWebsite: {website}\nCountry: {country}\n\n\
         Website content:\n{page_text}\n\n\
         From the content above, identify:\n\
         - services: the specific services offered (e.g. \"Social Media Management, Content Creation, Paid Advertising\")\n\
         - niche: the primary specialization (e.g. \"ecommerce\", \"B2B SaaS\", \"local business\")\n\
         - notes: company size signals such as team size, client count, years in business\n\n\
         Reply with a single JSON object: \
         {{\"services\": \"...\", \"niche\": \"...\", \"notes\": \"...\"}}",
        name = record.agency_name,
        website = record.website,
        country = record.country,
    )
}

/// Parse the generator's reply into a profile.
///
/// Accepts a bare JSON object or one inside a fenced code block. `services`
/// may be a string or a list of strings and must not be empty.
pub fn parse_profile(reply: &str) -> Result<AgencyProfile> {
    let raw: RawProfile = serde_json::from_str(json_body(reply))
        .map_err(|e| LeadGenError::parse(format!("enrichment reply is not the expected JSON: {e}")))?;

    let services = match raw.services {
        ServiceList::One(s) => s.trim().to_string(),
        ServiceList::Many(items) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
    };
    if services.is_empty() {
        return Err(LeadGenError::parse("enrichment reply has no services"));
    }

    Ok(AgencyProfile {
        services,
        niche: non_blank(raw.niche),
        notes: non_blank(raw.notes),
    })
}

/// The contents of the first fenced block, or the whole reply.
fn json_body(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let inner = &trimmed[start + 3..];
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{FakeFetcher, FakeGenerator, record};

    const HOME: &str = "<html><body><h1>Kasvu Digital</h1><p>We run paid social for ecommerce brands. Team of 12.</p></body></html>";

    #[test]
    fn parses_plain_json() {
        let profile = parse_profile(
            r#"{"services": "Paid Social, Content", "niche": "ecommerce", "notes": "Team of 12"}"#,
        )
        .unwrap();
        assert_eq!(profile.services, "Paid Social, Content");
        assert_eq!(profile.niche.as_deref(), Some("ecommerce"));
        assert_eq!(profile.notes.as_deref(), Some("Team of 12"));
    }

    #[test]
    fn parses_fenced_json_with_service_list() {
        let reply = "Here is the analysis:\n```json\n{\"services\": [\"SEO\", \" \", \"Paid Social\"], \"niche\": \"\"}\n```";
        let profile = parse_profile(reply).unwrap();
        assert_eq!(profile.services, "SEO, Paid Social");
        assert_eq!(profile.niche, None);
        assert_eq!(profile.notes, None);
    }

    #[test]
    fn rejects_prose_and_missing_services() {
        assert!(parse_profile("They do social media for shops.").is_err());
        assert!(parse_profile(r#"{"niche": "ecommerce"}"#).is_err());
        assert!(parse_profile(r#"{"services": "   "}"#).is_err());
        assert!(parse_profile(r#"{"services": 42}"#).is_err());
    }

    #[tokio::test]
    async fn enriches_and_isolates_failures() {
        let fetcher = FakeFetcher::default()
            .page("https://kasvu.fi/", HOME)
            .page("https://lumo.fi/", "<p>Lumo Creative builds brands.</p>");
        let generator = FakeGenerator::new(|req| {
            if req.prompt.contains("Lumo") {
                Ok("I could not tell.".into())
            } else {
                Ok(r#"{"services": "Paid Social", "niche": "ecommerce", "notes": "Team of 12"}"#.into())
            }
        });

        let records = vec![
            record("Kasvu Digital", "https://kasvu.fi/"),
            record("Down Agency", "https://down.fi/"),
            record("Lumo", "https://lumo.fi/"),
        ];
        let out = enrich_records(records, &fetcher, &generator, &SilentProgress).await;

        let names: Vec<&str> = out.iter().map(|r| r.agency_name.as_str()).collect();
        assert_eq!(names, vec!["Kasvu Digital", "Down Agency", "Lumo"]);

        assert_eq!(out[0].enrichment_status, EnrichmentStatus::Complete);
        assert_eq!(out[0].services.as_deref(), Some("Paid Social"));

        assert_eq!(out[1].enrichment_status, EnrichmentStatus::Incomplete);
        assert!(out[1].notes.as_deref().unwrap().starts_with("Enrichment failed:"));
        assert_eq!(out[1].services, None);

        assert_eq!(out[2].enrichment_status, EnrichmentStatus::Incomplete);
        assert_eq!(out[2].niche, None);

        // The unreachable site never reaches the generator.
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn unavailable_generator_degrades_every_record() {
        let fetcher = FakeFetcher::default()
            .page("https://kasvu.fi/", HOME)
            .page("https://lumo.fi/", HOME);
        let generator =
            FakeGenerator::new(|_| Err(LeadGenError::Unavailable("credential rejected".into())));

        let records = vec![
            record("Kasvu Digital", "https://kasvu.fi/"),
            record("Lumo", "https://lumo.fi/"),
        ];
        let out = enrich_records(records, &fetcher, &generator, &SilentProgress).await;

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.enrichment_status == EnrichmentStatus::Incomplete));
        assert!(out.iter().all(|r| r.notes.as_deref().unwrap().contains("unavailable")));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn profiles_enriched_before_an_outage_are_kept() {
        let fetcher = FakeFetcher::default()
            .page("https://alpha.fi/", HOME)
            .page("https://beta.fi/", HOME)
            .page("https://gamma.fi/", HOME);
        let generator = FakeGenerator::new(|req| {
            if req.prompt.contains("Agency: Alpha") {
                Ok(r#"{"services": "Paid Social", "niche": "retail"}"#.into())
            } else {
                Err(LeadGenError::Unavailable("credential revoked".into()))
            }
        });

        let records = vec![
            record("Alpha", "https://alpha.fi/"),
            record("Beta", "https://beta.fi/"),
            record("Gamma", "https://gamma.fi/"),
        ];
        let out = enrich_records(records, &fetcher, &generator, &SilentProgress).await;

        assert_eq!(out[0].enrichment_status, EnrichmentStatus::Complete);
        assert_eq!(out[0].services.as_deref(), Some("Paid Social"));
        assert_eq!(out[0].niche.as_deref(), Some("retail"));
        for lead in &out[1..] {
            assert_eq!(lead.enrichment_status, EnrichmentStatus::Incomplete);
            assert!(lead.notes.as_deref().unwrap().contains("unavailable"));
        }
        assert_eq!(out[2].agency_name, "Gamma");
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn record_without_identity_is_incomplete() {
        let fetcher = FakeFetcher::default();
        let generator = FakeGenerator::new(|_| Ok(r#"{"services": "SEO"}"#.into()));

        let out = enrich_records(
            vec![record("Nameless", "")],
            &fetcher,
            &generator,
            &SilentProgress,
        )
        .await;
        assert_eq!(out[0].enrichment_status, EnrichmentStatus::Incomplete);
        assert_eq!(fetcher.fetch_count(), 0);
    }
}
