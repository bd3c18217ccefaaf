//! Sortlist agency listings.
//!
//! Listing cards only link to a Sortlist profile, so each card costs one
//! extra fetch to read the agency's own website from the profile page.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

use leadgen_crawler::PageFetcher;
use leadgen_shared::{LeadGenError, Result};

use crate::source::{AgencyCandidate, AgencySource, category_slug, country_slug};

const DEFAULT_BASE_URL: &str = "https://www.sortlist.com";

/// Reads `{base}/s/{country}/{category}` listing pages plus agency profiles.
pub struct SortlistSource {
    base_url: Url,
    fetcher: Arc<dyn PageFetcher>,
}

impl SortlistSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(fetcher: Arc<dyn PageFetcher>, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LeadGenError::config(format!("invalid Sortlist base URL: {e}")))?;
        Ok(Self { base_url, fetcher })
    }

    fn listing_url(&self, country: &str, query: &str) -> Result<Url> {
        let path = format!("s/{}/{}", country_slug(country), category_slug(query));
        self.base_url
            .join(&path)
            .map_err(|e| LeadGenError::Discovery(format!("bad Sortlist listing URL: {e}")))
    }

    /// The agency's own site from its profile page. Failures skip the card.
    async fn website_from_profile(&self, profile_url: &Url) -> Option<String> {
        match self.fetcher.fetch(profile_url).await {
            Ok(page) => extract_website(&page.html, &page.url),
            Err(e) => {
                warn!(url = %profile_url, error = %e, "error extracting website from profile");
                None
            }
        }
    }
}

#[async_trait]
impl AgencySource for SortlistSource {
    fn name(&self) -> &str {
        "sortlist"
    }

    #[instrument(skip_all, fields(source = "sortlist", country = %country))]
    async fn search(
        &self,
        country: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<AgencyCandidate>> {
        let url = self.listing_url(country, query)?;
        debug!(%url, "fetching listing");
        let page = self.fetcher.fetch(&url).await?;

        let mut agencies = Vec::new();
        for (name, profile_url) in parse_cards(&page.html, &page.url, max_results) {
            if let Some(website) = self.website_from_profile(&profile_url).await {
                agencies.push(AgencyCandidate {
                    agency_name: name,
                    website,
                    country: country.to_string(),
                });
            }
        }

        info!(count = agencies.len(), "parsed Sortlist listing");
        Ok(agencies)
    }
}

/// `(name, profile URL)` for each `div.agency-card` that has both.
fn parse_cards(html: &str, page_url: &Url, max_results: usize) -> Vec<(String, Url)> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse("div.agency-card").expect("valid selector");
    let name_sel = Selector::parse("h3").expect("valid selector");
    let link_sel = Selector::parse("a[href]").expect("valid selector");

    doc.select(&card_sel)
        .take(max_results)
        .filter_map(|card| {
            let name = card.select(&name_sel).next()?;
            let link = card.select(&link_sel).next()?;
            let name = name.text().collect::<String>().trim().to_string();
            let profile = page_url.join(link.value().attr("href")?.trim()).ok()?;
            Some((name, profile))
        })
        .collect()
}

/// The first outbound `nofollow noopener` link opening in a new tab.
fn extract_website(html: &str, page_url: &Url) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(r#"a[rel="nofollow noopener"][target="_blank"][href]"#)
        .expect("valid selector");
    let href = doc.select(&sel).next()?.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    page_url.join(href).ok().map(|u| u.to_string())
}
