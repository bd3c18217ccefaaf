//! Agency discovery from public directory listings.
//!
//! Each directory is an [`AgencySource`]. [`AgencyDirectory`] queries them in
//! turn, tolerates individual source failures, and merges the results into a
//! deduplicated, bounded candidate list.

mod clutch;
mod directory;
mod source;
mod sortlist;

pub use clutch::ClutchSource;
pub use directory::AgencyDirectory;
pub use source::{AgencyCandidate, AgencySource, category_slug, country_slug};
pub use sortlist::SortlistSource;
