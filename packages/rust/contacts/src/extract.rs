use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Domains that only ever show up in templates and form placeholders.
const PLACEHOLDER_DOMAINS: &[&str] = &["example.com", "test.com", "domain.com", "email.com"];

/// Image filenames like `logo@2x.png` look like addresses to the pattern.
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".gif", ".svg"];

/// Find every email-shaped token in `text`.
///
/// Results are lowercased and deduplicated, keeping the order in which
/// each address first appears.
pub fn extract_emails(text: &str) -> Vec<String> {
    static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid regex")
    });

    let mut seen = HashSet::new();
    let mut emails = Vec::new();

    for m in EMAIL_RE.find_iter(text) {
        let email = m.as_str().to_lowercase();
        if is_noise(&email) {
            continue;
        }
        if seen.insert(email.clone()) {
            emails.push(email);
        }
    }

    tracing::trace!(count = emails.len(), "extracted emails");
    emails
}

fn is_noise(email: &str) -> bool {
    PLACEHOLDER_DOMAINS.iter().any(|d| email.contains(d))
        || IMAGE_SUFFIXES.iter().any(|ext| email.ends_with(ext))
}
