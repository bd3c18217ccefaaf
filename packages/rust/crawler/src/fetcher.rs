//! HTTP page fetcher with rate limiting, retry, and SSRF protection.

use std::collections::HashSet;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use leadgen_shared::{LeadGenError, PipelineConfig, Result};

use crate::rate_limit::HostRateLimiter;
use crate::retry::{Attempt, RetryConfig, is_retryable_status, with_retry};

/// User-Agent string for every outbound request.
const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; LeadGen/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "nav", "footer", "header"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A same-host link with its anchor text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    pub url: Url,
    pub text: String,
}

/// A fetched page: raw HTML for pattern matching, bounded visible text for
/// prompts, and internal links for navigation.
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: Url,
    pub html: String,
    pub text: String,
    pub links: Vec<PageLink>,
}

/// Fetch capability shared by discovery sources and the contact stage.
///
/// Failures scoped to one URL are `Network` or `Parse` errors. An
/// implementation returns `Unavailable` only when it can no longer fetch
/// anything; [`HttpFetcher`] never does, since each request stands alone.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET a page and parse it.
    async fn fetch(&self, url: &Url) -> Result<ScrapedPage>;

    /// HEAD a URL; `true` only for a 200 response.
    async fn probe(&self, url: &Url) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// FetcherConfig
// ---------------------------------------------------------------------------

/// Runtime settings for [`HttpFetcher`].
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub rate_limit: Duration,
    pub retry: RetryConfig,
    pub max_text_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            rate_limit: Duration::from_millis(1500),
            retry: RetryConfig::default(),
            max_text_chars: 5000,
        }
    }
}

impl From<&PipelineConfig> for FetcherConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            rate_limit: Duration::from_millis(config.rate_limit_ms),
            retry: RetryConfig {
                max_attempts: config.max_retries,
                ..RetryConfig::default()
            },
            max_text_chars: config.max_text_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// reqwest-backed [`PageFetcher`].
pub struct HttpFetcher {
    client: Client,
    limiter: HostRateLimiter,
    retry: RetryConfig,
    max_text_chars: usize,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout)
            .build()
            .map_err(|e| LeadGenError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            limiter: HostRateLimiter::new(config.rate_limit),
            retry: config.retry,
            max_text_chars: config.max_text_chars,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    fn guard(&self, url: &Url) -> Result<()> {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(LeadGenError::Network(format!("{url}: blocked target")));
        }
        Ok(())
    }

    async fn get_once(&self, url: &Url) -> std::result::Result<String, Attempt> {
        self.limiter.wait(url).await;
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| Attempt::Transient(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let msg = format!("{url}: HTTP {status}");
            return Err(if is_retryable_status(status) {
                Attempt::Transient(msg)
            } else {
                Attempt::Final(msg)
            });
        }

        response
            .text()
            .await
            .map_err(|e| Attempt::Transient(format!("{url}: body read failed: {e}")))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<ScrapedPage> {
        self.guard(url)?;

        let html = with_retry(&self.retry, url.as_str(), move || self.get_once(url))
            .await
            .map_err(LeadGenError::Network)?;

        Ok(parse_page(url, html, self.max_text_chars))
    }

    async fn probe(&self, url: &Url) -> Result<bool> {
        self.guard(url)?;
        self.limiter.wait(url).await;

        match self.client.head(url.as_str()).send().await {
            Ok(response) => {
                debug!(%url, status = %response.status(), "probed");
                Ok(response.status() == StatusCode::OK)
            }
            Err(e) => {
                debug!(%url, error = %e, "probe failed");
                Ok(false)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse raw HTML into a [`ScrapedPage`].
pub fn parse_page(url: &Url, html: String, max_text_chars: usize) -> ScrapedPage {
    let doc = Html::parse_document(&html);
    let text = visible_text(&doc, max_text_chars);
    let links = extract_links(&doc, url);

    ScrapedPage {
        url: url.clone(),
        html,
        text,
        links,
    }
}

/// Whitespace-collapsed page text without page chrome, bounded in chars.
fn visible_text(doc: &Html, max_chars: usize) -> String {
    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > max_chars {
        collapsed.chars().take(max_chars).collect()
    } else {
        collapsed
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_ELEMENTS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

/// Same-host links, resolved and de-fragmented, first occurrence wins.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<PageLink> {
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        // Skip anchors, javascript:, mailto:
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(mut resolved) = base_url.join(href) else {
            continue;
        };
        resolved.set_fragment(None);

        if !matches!(resolved.scheme(), "http" | "https")
            || resolved.host_str() != base_url.host_str()
        {
            continue;
        }

        if seen.insert(resolved.to_string()) {
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            links.push(PageLink {
                url: resolved,
                text,
            });
        }
    }

    links
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const AGENCY_HOME: &str = r##"<html>
<head><title>Kasvu Digital</title><style>.x { color: red }</style></head>
<body>
  <header><a href="/">Home</a></header>
  <nav><a href="/services">Services</a></nav>
  <main>
    <h1>Social media that   grows</h1>
    <p>We run paid social for B2B brands.</p>
    <a href="/yhteystiedot">Ota yhteyttä</a>
    <a href="/about#team">About  us</a>
    <a href="#top">Top</a>
    <a href="mailto:hello@kasvu.fi">Email</a>
    <a href="javascript:void(0)">Menu</a>
    <a href="https://www.linkedin.com/company/kasvu">LinkedIn</a>
  </main>
  <script>var analytics = 1;</script>
  <footer>Copyright Kasvu</footer>
</body></html>"##;

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(FetcherConfig {
            timeout: Duration::from_secs(5),
            rate_limit: Duration::ZERO,
            retry: RetryConfig::immediate(3),
            max_text_chars: 5000,
        })
        .unwrap()
        .allow_localhost()
    }

    #[test]
    fn text_skips_chrome_and_collapses_whitespace() {
        let url = Url::parse("https://kasvu.fi/").unwrap();
        let page = parse_page(&url, AGENCY_HOME.to_string(), 5000);

        assert!(page.text.contains("Social media that grows"));
        assert!(page.text.contains("We run paid social for B2B brands."));
        assert!(!page.text.contains("analytics"));
        assert!(!page.text.contains("Copyright"));
        assert!(!page.text.contains("color: red"));
        assert!(!page.text.contains("  "));
    }

    #[test]
    fn text_is_bounded() {
        let url = Url::parse("https://kasvu.fi/").unwrap();
        let page = parse_page(&url, AGENCY_HOME.to_string(), 10);
        assert_eq!(page.text.chars().count(), 10);
    }

    #[test]
    fn links_are_internal_resolved_and_labelled() {
        let url = Url::parse("https://kasvu.fi/").unwrap();
        let page = parse_page(&url, AGENCY_HOME.to_string(), 5000);

        let urls: Vec<&str> = page.links.iter().map(|l| l.url.as_str()).collect();
        assert!(urls.contains(&"https://kasvu.fi/yhteystiedot"));
        assert!(urls.contains(&"https://kasvu.fi/about"));
        assert!(!urls.iter().any(|u| u.contains("linkedin")));
        assert!(!urls.iter().any(|u| u.contains('#')));

        let about = page
            .links
            .iter()
            .find(|l| l.url.path() == "/about")
            .unwrap();
        assert_eq!(about.text, "About us");
    }

    #[test]
    fn html_keeps_mailto_for_email_extraction() {
        let url = Url::parse("https://kasvu.fi/").unwrap();
        let page = parse_page(&url, AGENCY_HOME.to_string(), 5000);
        assert!(page.html.contains("hello@kasvu.fi"));
    }

    #[test]
    fn ssrf_blocks_private_targets() {
        for raw in [
            "file:///etc/passwd",
            "http://192.168.1.1/admin",
            "http://10.0.0.1/",
            "http://127.0.0.1:8080/",
            "http://[::1]/",
            "http://localhost:3000/api",
            "http://printer.local/",
        ] {
            let url = Url::parse(raw).unwrap();
            assert!(is_ssrf_target(&url), "{raw} should be blocked");
        }
        let url = Url::parse("https://kasvu.fi/contact").unwrap();
        assert!(!is_ssrf_target(&url));
    }

    #[tokio::test]
    async fn guard_applies_without_allow_localhost() {
        let fetcher = HttpFetcher::new(FetcherConfig::default()).unwrap();
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn fetches_and_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(AGENCY_HOME))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();
        assert!(page.text.contains("paid social"));
        assert!(page.links.iter().any(|l| l.url.path() == "/yhteystiedot"));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok now</p>"))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/flaky", server.uri())).unwrap();
        let page = fetcher().fetch(&url).await.unwrap();
        assert_eq!(page.text, "ok now");
    }

    #[tokio::test]
    async fn not_found_is_final() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, LeadGenError::Network(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn probe_reports_only_200() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/contact"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let fetcher = fetcher();
        let hit = Url::parse(&format!("{}/contact", server.uri())).unwrap();
        let miss = Url::parse(&format!("{}/kontakt", server.uri())).unwrap();
        assert!(fetcher.probe(&hit).await.unwrap());
        assert!(!fetcher.probe(&miss).await.unwrap());
    }
}
