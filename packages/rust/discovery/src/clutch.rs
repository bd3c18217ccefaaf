//! Clutch.co agency listings.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use leadgen_crawler::PageFetcher;
use leadgen_shared::{LeadGenError, Result};

use crate::source::{AgencyCandidate, AgencySource, category_slug, country_slug};

const DEFAULT_BASE_URL: &str = "https://clutch.co";

/// Reads `{base}/agencies/{category}/{country}` listing pages.
pub struct ClutchSource {
    base_url: Url,
    fetcher: Arc<dyn PageFetcher>,
}

impl ClutchSource {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        Self::with_base_url(fetcher, DEFAULT_BASE_URL)
    }

    /// Point the source at another host (mock servers in tests).
    pub fn with_base_url(fetcher: Arc<dyn PageFetcher>, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LeadGenError::config(format!("invalid Clutch base URL: {e}")))?;
        Ok(Self { base_url, fetcher })
    }

    fn listing_url(&self, country: &str, query: &str) -> Result<Url> {
        let path = format!(
            "agencies/{}/{}",
            category_slug(query),
            country_slug(country)
        );
        self.base_url
            .join(&path)
            .map_err(|e| LeadGenError::Discovery(format!("bad Clutch listing URL: {e}")))
    }
}

#[async_trait]
impl AgencySource for ClutchSource {
    fn name(&self) -> &str {
        "clutch"
    }

    #[instrument(skip_all, fields(source = "clutch", country = %country))]
    async fn search(
        &self,
        country: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<AgencyCandidate>> {
        let url = self.listing_url(country, query)?;
        debug!(%url, "fetching listing");
        let page = self.fetcher.fetch(&url).await?;

        let agencies = parse_listing(&page.html, &page.url, country, max_results);
        info!(count = agencies.len(), "parsed Clutch listing");
        Ok(agencies)
    }
}

/// Parse `div.provider-info` cards into candidates.
fn parse_listing(html: &str, page_url: &Url, country: &str, max_results: usize) -> Vec<AgencyCandidate> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse("div.provider-info").expect("valid selector");
    let name_sel = Selector::parse("h3.company_title").expect("valid selector");
    let link_sel = Selector::parse("a.website-link[href]").expect("valid selector");

    doc.select(&card_sel)
        .take(max_results)
        .filter_map(|card| {
            let name = card.select(&name_sel).next()?;
            let link = card.select(&link_sel).next()?;
            let name = name.text().collect::<String>().trim().to_string();
            let href = link.value().attr("href")?.trim();
            let website = page_url.join(href).ok()?.to_string();
            Some(AgencyCandidate {
                agency_name: name,
                website,
                country: country.to_string(),
            })
        })
        .collect()
}
