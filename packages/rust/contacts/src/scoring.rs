//! Decision-maker ranking for candidate addresses.
//!
//! Scores are additive:
//!
//! | rule                                             | points |
//! |--------------------------------------------------|--------|
//! | local part is a generic mailbox                  | -10    |
//! | keyword inside the local part (per keyword)      | +15    |
//! | keyword within 100 chars before the address      | +10    |
//! | keyword within 100 chars after the address       | +10    |
//! | at most two dot segments and under 20 chars      | +5     |
//! | `word.word` local part                           | +8     |
//! | otherwise bare `word` local part                 | +6     |

use std::sync::LazyLock;

use regex::Regex;

/// Shared-inbox local parts.
pub const GENERIC_PREFIXES: &[&str] = &[
    "info", "contact", "hello", "support", "sales", "admin", "office", "team", "mail", "general",
];

/// Titles that suggest the address belongs to someone who can sign off.
pub const DECISION_MAKER_KEYWORDS: &[&str] = &[
    "ceo",
    "founder",
    "co-founder",
    "owner",
    "president",
    "director",
    "managing director",
    "chief executive",
    "principal",
    "partner",
    "head of",
    "cmo",
    "vp",
];

/// Proximity window in characters.
const PROXIMITY: usize = 100;

/// The part of an address before the `@`.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Whether the address is a shared inbox such as `info@` or `sales@`.
pub fn is_generic_mailbox(email: &str) -> bool {
    let local = local_part(email).to_lowercase();
    GENERIC_PREFIXES.contains(&local.as_str())
}

/// Score one candidate against the page text it was found in.
pub fn score_candidate(email: &str, context: &str) -> i32 {
    static FIRST_LAST_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-z]+\.[a-z]+$").expect("valid regex"));
    static SINGLE_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-z]+$").expect("valid regex"));

    let email = email.to_lowercase();
    let local = local_part(&email);
    let context = context.to_lowercase();
    let mut score = 0;

    if GENERIC_PREFIXES.contains(&local) {
        score -= 10;
    }

    for keyword in DECISION_MAKER_KEYWORDS {
        let squashed = keyword.replace(' ', "");
        let dotted = keyword.replace(' ', ".");
        if local.contains(&squashed) || local.contains(&dotted) {
            score += 15;
        }

        if near(&context, keyword, &email, Side::Before) {
            score += 10;
        }
        if near(&context, keyword, &email, Side::After) {
            score += 10;
        }
    }

    if local.split('.').count() <= 2 && local.chars().count() < 20 {
        score += 5;
    }

    if FIRST_LAST_RE.is_match(local) {
        score += 8;
    } else if SINGLE_WORD_RE.is_match(local) {
        score += 6;
    }

    score
}

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

/// Whether `keyword` occurs within the proximity window on one side of `email`.
fn near(context: &str, keyword: &str, email: &str, side: Side) -> bool {
    let (kw, addr) = (regex::escape(keyword), regex::escape(email));
    let pattern = match side {
        Side::Before => format!("{kw}.{{0,{PROXIMITY}}}{addr}"),
        Side::After => format!("{addr}.{{0,{PROXIMITY}}}{kw}"),
    };
    Regex::new(&pattern).is_ok_and(|re| re.is_match(context))
}

/// Pick the most likely decision-maker address.
///
/// Candidates are ranked with [`score_candidate`] using a stable sort, so
/// ties keep discovery order. A positive top score wins outright. Otherwise
/// the first non-generic address (in the original order) is returned, and
/// failing that the first address. Returns `None` only for an empty list.
pub fn pick_decision_maker(candidates: &[String], context: &str) -> Option<String> {
    let first = candidates.first()?;

    let mut ranked: Vec<(i32, &String)> = candidates
        .iter()
        .map(|email| (score_candidate(email, context), email))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    let (top, best) = ranked[0];
    if top > 0 {
        tracing::debug!(email = %best, score = top, "selected decision-maker address");
        return Some(best.clone());
    }

    let fallback = candidates
        .iter()
        .find(|e| !is_generic_mailbox(e))
        .unwrap_or(first);
    tracing::debug!(email = %fallback, "no positive score, using fallback address");
    Some(fallback.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn founder_address_beats_generic_inbox() {
        assert_eq!(score_candidate("jane.founder@acme.fi", ""), 28);
        assert_eq!(score_candidate("info@acme.fi", ""), 1);

        let picked = pick_decision_maker(&emails(&["info@acme.fi", "jane.founder@acme.fi"]), "");
        assert_eq!(picked.as_deref(), Some("jane.founder@acme.fi"));
    }

    #[test]
    fn first_last_pattern_scores_thirteen() {
        assert_eq!(score_candidate("jane.doe@acme.fi", ""), 13);
        assert_eq!(score_candidate("jane@acme.fi", ""), 11);
    }

    #[test]
    fn proximity_on_both_sides_adds_twenty() {
        let context = "Our CEO can be reached at mikko@acme.fi, reach out to the founder any time.";
        // +5 concise, +6 bare word, +10 ceo before, +10 founder after
        assert_eq!(score_candidate("mikko@acme.fi", context), 31);
    }

    #[test]
    fn proximity_outside_window_is_ignored() {
        let padding = "x".repeat(150);
        let context = format!("CEO {padding} mikko@acme.fi");
        assert_eq!(score_candidate("mikko@acme.fi", &context), 11);
    }

    #[test]
    fn multi_word_keywords_match_squashed_and_dotted() {
        // "managing.director" contains managing director (dotted) and director
        let score = score_candidate("managing.director@acme.fi", "");
        assert_eq!(score, 15 + 15 + 5 + 8);
        let score = score_candidate("headof.growth@acme.fi", "");
        assert_eq!(score, 15 + 5 + 8);
    }

    #[test]
    fn generic_only_is_exact_local_part() {
        assert!(is_generic_mailbox("info@acme.fi"));
        assert!(is_generic_mailbox("Sales@acme.fi"));
        assert!(!is_generic_mailbox("information@acme.fi"));
        assert!(!is_generic_mailbox("jane@acme.fi"));
    }

    #[test]
    fn non_positive_top_falls_back_to_first_non_generic() {
        // Long, many-segment addresses collect no points.
        let candidates = emails(&["x1.y2.z3.w4.long-address@acme.fi", "q.r.s.t.u.v-2024@acme.fi"]);
        assert_eq!(
            pick_decision_maker(&candidates, "").as_deref(),
            Some("x1.y2.z3.w4.long-address@acme.fi")
        );
    }

    #[test]
    fn generic_inbox_still_beats_unscored_addresses() {
        let candidates = emails(&["support.desk.team.x@acme.fi", "admin@acme.fi"]);
        // -10 + 5 + 6 leaves admin@ at 1.
        assert_eq!(
            pick_decision_maker(&candidates, "").as_deref(),
            Some("admin@acme.fi")
        );
    }

    #[test]
    fn ties_keep_discovery_order() {
        let candidates = emails(&["anna@acme.fi", "mikko@acme.fi"]);
        assert_eq!(
            pick_decision_maker(&candidates, "").as_deref(),
            Some("anna@acme.fi")
        );
    }

    #[test]
    fn empty_list_yields_none() {
        assert!(pick_decision_maker(&[], "ceo").is_none());
    }

    #[test]
    fn ranking_is_deterministic() {
        let candidates = emails(&["hello@acme.fi", "p.k@acme.fi", "owner@acme.fi"]);
        let context = "Contact the owner: owner@acme.fi";
        let a = pick_decision_maker(&candidates, context);
        let b = pick_decision_maker(&candidates, context);
        assert_eq!(a, b);
        assert_eq!(a.as_deref(), Some("owner@acme.fi"));
    }
}
