//! Core domain types for lead records flowing through the pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column order for every tabular export (file and spreadsheet).
pub const EXPORT_HEADERS: [&str; 9] = [
    "agency_name",
    "country",
    "website",
    "services",
    "niche",
    "contact_name",
    "email",
    "lead_score",
    "outreach_message",
];

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Outcome of the enrichment stage for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStatus {
    #[default]
    Pending,
    Complete,
    Incomplete,
}

/// Outcome of the contact stage for one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    Pending,
    Found,
    NotFound,
}

/// Hot/Warm/Cold classification derived from data completeness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeadScore {
    Hot,
    Warm,
    Cold,
}

impl LeadScore {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "Hot",
            Self::Warm => "Warm",
            Self::Cold => "Cold",
        }
    }
}

impl std::fmt::Display for LeadScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LeadRecord
// ---------------------------------------------------------------------------

/// One agency tracked through the pipeline.
///
/// Identity fields are set once by discovery. Every later stage fills its own
/// group of optional fields and advances exactly one status field; no stage
/// removes a record. The lead score is not stored: it is derived on demand
/// from the current field values, so it can never go stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    // Identity (discovery)
    pub agency_name: String,
    pub website: String,
    pub country: String,

    // Enrichment
    #[serde(default)]
    pub services: Option<String>,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub enrichment_status: EnrichmentStatus,

    // Contact
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub contact_status: ContactStatus,

    // Outreach
    #[serde(default)]
    pub outreach_message: Option<String>,
    #[serde(default)]
    pub message_length: Option<usize>,
}

impl LeadRecord {
    /// Create a record with only identity fields set and every status pending.
    pub fn new(
        agency_name: impl Into<String>,
        website: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            agency_name: agency_name.into(),
            website: website.into(),
            country: country.into(),
            services: None,
            niche: None,
            notes: None,
            enrichment_status: EnrichmentStatus::Pending,
            contact_name: None,
            email: None,
            contact_status: ContactStatus::Pending,
            outreach_message: None,
            message_length: None,
        }
    }

    /// All three identity fields are non-empty.
    pub fn has_identity(&self) -> bool {
        !self.agency_name.trim().is_empty()
            && !self.website.trim().is_empty()
            && !self.country.trim().is_empty()
    }

    /// Derive the lead score from the current field values.
    ///
    /// Hot: email present and enrichment complete.
    /// Warm: website and services present.
    /// Cold: anything else.
    pub fn lead_score(&self) -> LeadScore {
        if is_present(&self.email) && self.enrichment_status == EnrichmentStatus::Complete {
            LeadScore::Hot
        } else if !self.website.trim().is_empty() && is_present(&self.services) {
            LeadScore::Warm
        } else {
            LeadScore::Cold
        }
    }

    /// Flatten into the export row, scoring at call time.
    pub fn to_row(&self) -> ExportRow {
        ExportRow {
            agency_name: self.agency_name.clone(),
            country: self.country.clone(),
            website: self.website.clone(),
            services: self.services.clone().unwrap_or_default(),
            niche: self.niche.clone().unwrap_or_default(),
            contact_name: self.contact_name.clone().unwrap_or_default(),
            email: self.email.clone().unwrap_or_default(),
            lead_score: self.lead_score(),
            outreach_message: self.outreach_message.clone().unwrap_or_default(),
        }
    }
}

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

// ---------------------------------------------------------------------------
// ExportRow
// ---------------------------------------------------------------------------

/// Flat, fully-populated row in [`EXPORT_HEADERS`] order.
///
/// Field declaration order is the column order; `csv` relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub agency_name: String,
    pub country: String,
    pub website: String,
    pub services: String,
    pub niche: String,
    pub contact_name: String,
    pub email: String,
    pub lead_score: LeadScore,
    pub outreach_message: String,
}

impl ExportRow {
    /// Row values as strings, in header order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.agency_name.clone(),
            self.country.clone(),
            self.website.clone(),
            self.services.clone(),
            self.niche.clone(),
            self.contact_name.clone(),
            self.email.clone(),
            self.lead_score.to_string(),
            self.outreach_message.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LeadRecord {
        LeadRecord::new("Acme Social", "https://acme.fi", "Finland")
    }

    #[test]
    fn new_record_is_pending() {
        let r = record();
        assert!(r.has_identity());
        assert_eq!(r.enrichment_status, EnrichmentStatus::Pending);
        assert_eq!(r.contact_status, ContactStatus::Pending);
        assert!(r.services.is_none());
        assert!(r.message_length.is_none());
    }

    #[test]
    fn identity_requires_all_three_fields() {
        assert!(!LeadRecord::new("", "https://acme.fi", "Finland").has_identity());
        assert!(!LeadRecord::new("Acme", " ", "Finland").has_identity());
        assert!(!LeadRecord::new("Acme", "https://acme.fi", "").has_identity());
    }

    #[test]
    fn hot_requires_email_and_complete_enrichment() {
        let mut r = record();
        r.email = Some("jane@acme.fi".into());
        r.enrichment_status = EnrichmentStatus::Complete;
        assert_eq!(r.lead_score(), LeadScore::Hot);

        r.enrichment_status = EnrichmentStatus::Incomplete;
        assert_eq!(r.lead_score(), LeadScore::Cold);
    }

    #[test]
    fn warm_requires_website_and_services() {
        let mut r = record();
        r.services = Some("Paid Social, Content".into());
        r.enrichment_status = EnrichmentStatus::Incomplete;
        assert_eq!(r.lead_score(), LeadScore::Warm);

        r.services = Some("   ".into());
        assert_eq!(r.lead_score(), LeadScore::Cold);
    }

    #[test]
    fn empty_email_does_not_make_hot() {
        let mut r = record();
        r.email = Some(String::new());
        r.enrichment_status = EnrichmentStatus::Complete;
        r.services = Some("SEO".into());
        assert_eq!(r.lead_score(), LeadScore::Warm);
    }

    #[test]
    fn score_tracks_field_changes() {
        let mut r = record();
        assert_eq!(r.lead_score(), LeadScore::Cold);
        r.services = Some("SEO".into());
        assert_eq!(r.lead_score(), LeadScore::Warm);
        r.email = Some("jane@acme.fi".into());
        r.enrichment_status = EnrichmentStatus::Complete;
        assert_eq!(r.lead_score(), LeadScore::Hot);
    }

    #[test]
    fn row_substitutes_empty_strings() {
        let row = record().to_row();
        assert_eq!(row.services, "");
        assert_eq!(row.email, "");
        assert_eq!(row.lead_score, LeadScore::Cold);

        let fields = row.to_fields();
        assert_eq!(fields.len(), EXPORT_HEADERS.len());
        assert_eq!(fields[0], "Acme Social");
        assert_eq!(fields[7], "Cold");
    }

    #[test]
    fn status_serialization_uses_snake_case() {
        let json = serde_json::to_string(&ContactStatus::NotFound).expect("serialize");
        assert_eq!(json, r#""not_found""#);
        let parsed: EnrichmentStatus = serde_json::from_str(r#""incomplete""#).expect("parse");
        assert_eq!(parsed, EnrichmentStatus::Incomplete);
    }

    #[test]
    fn word_count_splits_on_any_whitespace() {
        assert_eq!(word_count("Hi Jane,\n\nquick  question\tfor you"), 6);
        assert_eq!(word_count("   "), 0);
    }

    #[test]
    fn run_id_display_is_uuid() {
        let id = RunId::new();
        assert_eq!(id.to_string().len(), 36);
    }
}
