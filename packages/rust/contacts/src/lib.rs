//! Email extraction and decision-maker selection.
//!
//! Everything here is a pure function of its inputs: no I/O, no clock,
//! no randomness. The contact stage feeds it page text and gets back one
//! address (and maybe a name) per agency.

mod extract;
mod naming;
mod scoring;

pub use extract::extract_emails;
pub use naming::infer_contact_name;
pub use scoring::{
    DECISION_MAKER_KEYWORDS, GENERIC_PREFIXES, is_generic_mailbox, local_part, pick_decision_maker,
    score_candidate,
};
