//! Contact stage: find one decision-maker address per agency.

use tracing::{debug, info, instrument, warn};
use url::Url;

use leadgen_contacts::{extract_emails, infer_contact_name, pick_decision_maker};
use leadgen_crawler::{PageFetcher, ScrapedPage, locate_contact_page};
use leadgen_shared::{ContactStatus, LeadGenError, LeadRecord, Result};

use crate::pipeline::ProgressReporter;

/// A selected address and, when it can be inferred, the person's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub name: Option<String>,
}

/// Look up a contact for every record.
///
/// Unreachable sites, missing contact pages and pages without addresses all
/// end as `not_found` for that record only. An unavailable fetcher marks the
/// current and every later record `not_found`; contacts found before that
/// are kept.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn find_contacts(
    mut records: Vec<LeadRecord>,
    fetcher: &dyn PageFetcher,
    progress: &dyn ProgressReporter,
) -> Vec<LeadRecord> {
    let total = records.len();

    for i in 0..total {
        let outcome = find_contact(&records[i].website, fetcher).await;
        match outcome {
            Ok(Some(contact)) => {
                let record = &mut records[i];
                debug!(agency = %record.agency_name, email = %contact.email, "contact found");
                record.email = Some(contact.email);
                record.contact_name = contact.name;
                record.contact_status = ContactStatus::Found;
            }
            Ok(None) => {
                debug!(agency = %records[i].agency_name, "no email on site");
                mark_not_found(&mut records[i]);
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, remaining = total - i, "contact lookup unavailable, marking remaining records not found");
                for record in &mut records[i..] {
                    mark_not_found(record);
                }
                return records;
            }
            Err(e) => {
                let record = &mut records[i];
                warn!(agency = %record.agency_name, website = %record.website, error = %e, "contact lookup failed");
                mark_not_found(record);
            }
        }
        progress.record_done(i + 1, total, &records[i].agency_name);
    }

    let found = records
        .iter()
        .filter(|r| r.contact_status == ContactStatus::Found)
        .count();
    info!(found, not_found = total - found, "contact lookup finished");
    records
}

fn mark_not_found(record: &mut LeadRecord) {
    record.email = None;
    record.contact_name = None;
    record.contact_status = ContactStatus::NotFound;
}

/// Fetch the site, prefer addresses on its contact page, and fall back to
/// the homepage when the contact page has none or cannot be read.
pub async fn find_contact(website: &str, fetcher: &dyn PageFetcher) -> Result<Option<Contact>> {
    let url = Url::parse(website.trim())
        .map_err(|e| LeadGenError::parse(format!("invalid website URL: {e}")))?;
    let homepage = fetcher.fetch(&url).await?;

    let contact_page = match locate_contact_page(fetcher, &homepage).await {
        Some(page_url) => match fetcher.fetch(&page_url).await {
            Ok(page) => Some(page),
            Err(e) if e.is_unavailable() => return Err(e),
            Err(e) => {
                debug!(url = %page_url, error = %e, "contact page unreadable, using homepage");
                None
            }
        },
        None => None,
    };

    let from_contact = contact_page.as_ref().and_then(select_contact);
    Ok(from_contact.or_else(|| select_contact(&homepage)))
}

fn select_contact(page: &ScrapedPage) -> Option<Contact> {
    let emails = extract_emails(&page.html);
    let email = pick_decision_maker(&emails, &page.text)?;
    let name = infer_contact_name(&email, &page.text);
    Some(Contact { email, name })
}
