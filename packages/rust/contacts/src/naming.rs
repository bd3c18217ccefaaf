use std::sync::LazyLock;

use regex::Regex;

use crate::scoring::{DECISION_MAKER_KEYWORDS, GENERIC_PREFIXES, is_generic_mailbox, local_part};

/// Guess a person's name from a selected address.
///
/// Only `first.last` and bare `first` local parts yield a name. When the page
/// text mentions the person with capitalized words, that spelling is kept;
/// otherwise the local part is title-cased. Shared inboxes and role
/// addresses (`ceo@`, `jane.ceo@`, `head.growth@`) yield `None`.
pub fn infer_contact_name(email: &str, page_text: &str) -> Option<String> {
    static FIRST_LAST_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^([a-z]+)\.([a-z]+)$").expect("valid regex"));
    static SINGLE_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-z]+$").expect("valid regex"));

    if is_generic_mailbox(email) {
        return None;
    }
    let local = local_part(email).to_lowercase();
    if local.split('.').any(is_role_word) {
        return None;
    }

    if let Some(caps) = FIRST_LAST_RE.captures(&local) {
        let (first, last) = (&caps[1], &caps[2]);
        let pattern = format!(r"\b(?i:{first})\s+(?i:{last})\b");
        let found = find_capitalized(page_text, &pattern);
        return Some(found.unwrap_or_else(|| format!("{} {}", title_case(first), title_case(last))));
    }

    if SINGLE_WORD_RE.is_match(&local) {
        // Prefer "Jane Virtanen" over "Jane" when the page spells it out.
        let pattern = format!(r"\b(?i:{local})\s+[A-Z][a-zà-öø-ÿ]+\b");
        let found = find_capitalized(page_text, &pattern);
        return Some(found.unwrap_or_else(|| title_case(&local)));
    }

    None
}

/// A title or mailbox word, e.g. `ceo`, `head`, `sales`.
fn is_role_word(segment: &str) -> bool {
    GENERIC_PREFIXES.contains(&segment)
        || DECISION_MAKER_KEYWORDS
            .iter()
            .flat_map(|k| k.split(' '))
            .any(|word| word.len() > 2 && word == segment)
}

/// First match of `pattern` whose words all start uppercase, with
/// whitespace collapsed to single spaces.
fn find_capitalized(text: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.find_iter(text)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|name| {
            name.split(' ')
                .all(|w| w.chars().next().is_some_and(char::is_uppercase))
        })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
