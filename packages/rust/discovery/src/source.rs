use async_trait::async_trait;
use leadgen_shared::Result;

/// Identity data for one agency found in a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgencyCandidate {
    pub agency_name: String,
    pub website: String,
    pub country: String,
}

/// A directory that can list agencies for a country and category.
#[async_trait]
pub trait AgencySource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Return at most `max_results` candidates.
    async fn search(
        &self,
        country: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<AgencyCandidate>>;
}

/// Lowercase kebab-case, non-alphanumerics collapsed to single dashes.
pub(crate) fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Directory path segment for a country, e.g. "United Kingdom" -> "united-kingdom".
pub fn country_slug(country: &str) -> String {
    slugify(country)
}

/// Directory category for a free-text query, with a trailing
/// "agency"/"agencies" dropped: "social media marketing agency" ->
/// "social-media-marketing".
pub fn category_slug(query: &str) -> String {
    let mut words: Vec<&str> = query.split_whitespace().collect();
    if words.len() > 1
        && words
            .last()
            .is_some_and(|w| w.eq_ignore_ascii_case("agency") || w.eq_ignore_ascii_case("agencies"))
    {
        words.pop();
    }
    slugify(&words.join(" "))
}
