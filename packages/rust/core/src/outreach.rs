//! Outreach stage: one personalized cold email per record.

use tracing::{debug, info, instrument, warn};

use leadgen_shared::{LeadRecord, word_count};

use crate::llm::{GenerationRequest, TextGenerator};
use crate::pipeline::ProgressReporter;

pub(crate) const OUTREACH_SYSTEM: &str = "You are a cold email copywriter for B2B outreach to \
marketing agency owners. Your emails are personal, concise and value-driven, never pushy. \
Reply with the email body only: no subject line, no commentary.";

/// Generate a message for every record.
///
/// The word limit is an instruction to the generator, not a hard cap:
/// longer messages are kept and logged. A failed generation leaves an empty
/// message with length 0. An unavailable generator does that for the
/// current and every later record and stops the stage; messages already
/// written are kept.
#[instrument(skip_all, fields(records = records.len(), max_words = max_words))]
pub async fn write_outreach(
    mut records: Vec<LeadRecord>,
    generator: &dyn TextGenerator,
    max_words: usize,
    progress: &dyn ProgressReporter,
) -> Vec<LeadRecord> {
    let total = records.len();
    let mut over_limit = 0;

    for i in 0..total {
        let request = GenerationRequest {
            system: OUTREACH_SYSTEM.to_string(),
            prompt: outreach_prompt(&records[i], max_words),
        };
        match generator.generate(&request).await {
            Ok(message) => {
                let record = &mut records[i];
                let words = word_count(&message);
                if words > max_words {
                    over_limit += 1;
                    warn!(agency = %record.agency_name, words, max_words, "outreach message over word limit");
                } else {
                    debug!(agency = %record.agency_name, words, "outreach message written");
                }
                record.outreach_message = Some(message);
                record.message_length = Some(words);
            }
            Err(e) if e.is_unavailable() => {
                warn!(error = %e, remaining = total - i, "outreach generation unavailable, leaving remaining messages empty");
                for record in &mut records[i..] {
                    clear_message(record);
                }
                return records;
            }
            Err(e) => {
                warn!(agency = %records[i].agency_name, error = %e, "outreach generation failed");
                clear_message(&mut records[i]);
            }
        }
        progress.record_done(i + 1, total, &records[i].agency_name);
    }

    info!(over_limit, "outreach finished");
    records
}

fn clear_message(record: &mut LeadRecord) {
    record.outreach_message = Some(String::new());
    record.message_length = Some(0);
}

fn outreach_prompt(record: &LeadRecord, max_words: usize) -> String {
    let mut prompt = format!(
        "Write a cold email to the agency below.\n\nAgency: {}\nWebsite: {}\nCountry: {}\n",
        record.agency_name, record.website, record.country
    );
    if let Some(services) = present(&record.services) {
        prompt.push_str(&format!("Services: {services}\n"));
    }
    if let Some(niche) = present(&record.niche) {
        prompt.push_str(&format!("Niche: {niche}\n"));
    }
    match present(&record.contact_name) {
        Some(name) => prompt.push_str(&format!("Recipient: {name}\n")),
        None => prompt.push_str("Recipient: unknown, use a neutral greeting\n"),
    }
    prompt.push_str(&format!(
        "\nRequirements:\n\
         - At most {max_words} words\n\
         - Open with a line that references their services or niche\n\
         - Briefly explain how we can help an agency like theirs\n\
         - Exactly one call to action: a 15-minute call\n\
         - Professional but conversational tone, short sentences\n\
         - Address the recipient by name if known\n"
    ));
    prompt
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
