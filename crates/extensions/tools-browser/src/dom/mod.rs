//! Element discovery and addressing.
//!
//! - [`selector`] turns one element's attributes into a stable locator.
//! - [`candidates`] enumerates visible interactive elements, scores them
//!   against a natural-language intent and ranks them.
//! - [`analyst`] picks a single best candidate, optionally asking a model
//!   to break ties.

pub mod analyst;
pub mod candidates;
pub mod selector;

pub use analyst::{AnalystSelection, CandidateAnalyst};
pub use candidates::{Candidate, CandidateEngine, rank_candidates, score_element, transliterate};
pub use selector::{
    POSITION_FALLBACK_PREFIX, build_css_path, build_xpath, escape_css_id, escape_css_value,
    is_stable_id, is_utility_class, regenerate_selector, synthesize_selector,
};
