//! In-memory fakes of the capability traits for stage and pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use url::Url;

use leadgen_crawler::{PageFetcher, ScrapedPage, parse_page};
use leadgen_discovery::{AgencyCandidate, AgencySource};
use leadgen_shared::{ExportRow, LeadGenError, LeadRecord, Result};
use leadgen_sinks::RowSink;

use crate::llm::{GenerationRequest, TextGenerator};

/// Serves canned HTML by exact URL; anything else is a network error.
/// URLs registered with [`FakeFetcher::unavailable`] fail as if the fetcher
/// itself were unusable.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
    unavailable: HashSet<String>,
    fetches: AtomicUsize,
}

impl FakeFetcher {
    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn unavailable(mut self, url: &str) -> Self {
        self.unavailable.insert(url.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Result<ScrapedPage> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.contains(url.as_str()) {
            return Err(LeadGenError::Unavailable("fetcher shut down".into()));
        }
        match self.pages.get(url.as_str()) {
            Some(html) => Ok(parse_page(url, html.clone(), 5000)),
            None => Err(LeadGenError::Network(format!("{url}: HTTP 404"))),
        }
    }

    async fn probe(&self, url: &Url) -> Result<bool> {
        Ok(self.pages.contains_key(url.as_str()))
    }
}

type Reply = Box<dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync>;

/// Answers every request through a closure and counts calls.
pub struct FakeGenerator {
    reply: Reply,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new(reply: impl Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(request)
    }
}

/// Keeps written rows in memory, or fails every write.
#[derive(Default)]
pub struct MemorySink {
    pub rows: Mutex<Vec<ExportRow>>,
    pub fail_with: Option<String>,
}

impl MemorySink {
    pub fn failing(reason: &str) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        }
    }

    pub fn written(&self) -> Vec<ExportRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowSink for MemorySink {
    fn destination(&self) -> String {
        "memory".into()
    }

    async fn write_rows(&self, rows: &[ExportRow]) -> Result<()> {
        if let Some(reason) = &self.fail_with {
            return Err(LeadGenError::Export(reason.clone()));
        }
        self.rows.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
}

/// A directory source returning fixed `(name, website)` pairs.
pub struct FixedSource(pub Vec<(&'static str, &'static str)>);

#[async_trait]
impl AgencySource for FixedSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(
        &self,
        country: &str,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<AgencyCandidate>> {
        Ok(self
            .0
            .iter()
            .map(|(name, site)| AgencyCandidate {
                agency_name: name.to_string(),
                website: site.to_string(),
                country: country.to_string(),
            })
            .collect())
    }
}

pub fn record(name: &str, website: &str) -> LeadRecord {
    LeadRecord::new(name, website, "Finland")
}
