//! Page fetching for agency websites and directory listings.
//!
//! This crate provides:
//! - [`PageFetcher`]: the fetch capability used by discovery and the contact stage
//! - [`HttpFetcher`]: reqwest-backed fetcher with per-host rate limiting,
//!   retry with exponential backoff, and an SSRF guard
//! - [`locate_contact_page`]: finds a site's contact/about/team page

mod contact_page;
mod fetcher;
mod rate_limit;
pub mod retry;

pub use contact_page::{CONTACT_KEYWORDS, FALLBACK_PATHS, locate_contact_page};
pub use fetcher::{FetcherConfig, HttpFetcher, PageFetcher, PageLink, ScrapedPage, parse_page};
pub use rate_limit::HostRateLimiter;
pub use retry::RetryConfig;
