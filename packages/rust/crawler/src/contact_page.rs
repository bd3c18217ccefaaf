use tracing::debug;
use url::Url;

use crate::fetcher::{PageFetcher, ScrapedPage};

/// Link keywords in priority order. Localized variants come before the
/// broader about/team pages.
pub const CONTACT_KEYWORDS: &[&str] = &[
    "contact",
    "kontakt",
    "yhteystiedot",
    "get-in-touch",
    "reach-us",
    "contact-us",
    "contacto",
    "contato",
    "about",
    "team",
];

/// Paths probed on the site origin when no link matches.
pub const FALLBACK_PATHS: &[&str] = &["/contact", "/contact-us", "/get-in-touch", "/kontakt"];

/// Find the contact page for a site from its already-fetched homepage.
///
/// Each keyword is tried against every link's href and anchor text before
/// moving to the next keyword. Without a match, the fallback paths are
/// probed and the first 200 wins.
pub async fn locate_contact_page(
    fetcher: &dyn PageFetcher,
    homepage: &ScrapedPage,
) -> Option<Url> {
    for keyword in CONTACT_KEYWORDS {
        let hit = homepage.links.iter().find(|link| {
            link.url != homepage.url
                && (link_target(&link.url).contains(keyword)
                    || link.text.to_lowercase().contains(keyword))
        });
        if let Some(link) = hit {
            debug!(keyword, url = %link.url, "contact page linked from homepage");
            return Some(link.url.clone());
        }
    }

    for suffix in FALLBACK_PATHS {
        let Ok(candidate) = homepage.url.join(suffix) else {
            continue;
        };
        match fetcher.probe(&candidate).await {
            Ok(true) => {
                debug!(url = %candidate, "contact page found by probing");
                return Some(candidate);
            }
            Ok(false) => {}
            Err(e) => debug!(url = %candidate, error = %e, "probe rejected"),
        }
    }

    None
}

/// Lowercased path and query of a link. The host is left out so a domain
/// like `contactly.fi` does not match every internal link.
fn link_target(url: &Url) -> String {
    let mut target = url.path().to_lowercase();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(&query.to_lowercase());
    }
    target
}
