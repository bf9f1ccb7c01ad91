//! DOM candidate engine.
//!
//! Candidates are recomputed on every query; the page is assumed to change
//! between calls, so nothing is cached.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use webpilot_protocols::{BoundingBox, BrowserDriver, BrowserError, RawElement};

use super::selector::{MAX_PATH_DEPTH, build_css_path, build_xpath, synthesize_selector, truncate_chars};

/// Characters of visible text kept on a candidate.
pub const CANDIDATE_TEXT_MAX_CHARS: usize = 100;

const EXACT_MATCH_SCORE: f64 = 1.0;
const CONTAINS_INTENT_SCORE: f64 = 0.8;
const CONTAINED_IN_INTENT_SCORE: f64 = 0.7;
const WORD_OVERLAP_WEIGHT: f64 = 0.6;
const ROLE_BONUS: f64 = 0.1;
const VIEWPORT_BONUS: f64 = 0.05;

/// Brand names commonly written in either Latin or Cyrillic script.
const TRANSLITERATIONS: [(&str, &str); 9] = [
    ("milka", "милка"),
    ("милка", "milka"),
    ("oreo", "орео"),
    ("snickers", "сникерс"),
    ("mars", "марс"),
    ("twix", "твикс"),
    ("bounty", "баунти"),
    ("kitkat", "киткат"),
    ("nestle", "нестле"),
];

/// Selectors that address the whole document and are never returned.
const DEGENERATE_SELECTORS: [&str; 2] = ["body", "html"];

/// A scored, addressable element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Rank position in the result set.
    pub id: usize,
    pub tag: String,
    pub role: String,
    pub text: String,
    pub aria_label: String,
    pub placeholder: String,
    pub name: String,
    pub element_id: String,
    pub attributes: BTreeMap<String, String>,
    pub bbox: BoundingBox,
    pub css_path: String,
    pub xpath: String,
    pub score: f64,
    pub in_viewport: bool,
    pub selector: String,
}

impl Candidate {
    fn from_element(element: RawElement, score: f64) -> Self {
        let selector = synthesize_selector(&element);
        Self {
            id: 0,
            css_path: build_css_path(&element.ancestors, MAX_PATH_DEPTH),
            xpath: build_xpath(&element.ancestors, MAX_PATH_DEPTH),
            text: truncate_chars(element.text.trim(), CANDIDATE_TEXT_MAX_CHARS),
            tag: element.tag,
            role: element.role,
            aria_label: element.aria_label,
            placeholder: element.placeholder,
            name: element.name,
            element_id: element.id,
            attributes: element.attributes,
            bbox: element.bbox,
            score,
            in_viewport: element.in_viewport,
            selector,
        }
    }

    /// `(x, y)` of the element's top-left corner.
    pub fn position(&self) -> String {
        format!("({}, {})", self.bbox.x.round() as i64, self.bbox.y.round() as i64)
    }
}

/// Turns a natural-language intent into ranked candidates.
#[derive(Clone)]
pub struct CandidateEngine {
    driver: Arc<dyn BrowserDriver>,
}

impl CandidateEngine {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    /// Ranked candidates for `intent`, at most `limit`.
    ///
    /// An empty result means nothing matched; only driver failures are errors.
    pub async fn query(&self, intent: &str, limit: usize) -> Result<Vec<Candidate>, BrowserError> {
        let elements = self.driver.interactive_elements().await?;
        let total = elements.len();
        let candidates = rank_candidates(intent, elements, limit);
        debug!(
            intent,
            enumerated = total,
            returned = candidates.len(),
            "DOM candidate query"
        );
        Ok(candidates)
    }
}

/// Score, sort, truncate and address `elements`.
pub fn rank_candidates(intent: &str, elements: Vec<RawElement>, limit: usize) -> Vec<Candidate> {
    let mut scored: Vec<(f64, RawElement)> = elements
        .into_iter()
        .map(|el| (score_element(intent, &el), el))
        .filter(|(score, _)| *score > 0.0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| {
        sb.partial_cmp(sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.in_viewport.cmp(&a.in_viewport))
            .then_with(|| a.bbox.y.partial_cmp(&b.bbox.y).unwrap_or(Ordering::Equal))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(score, el)| Candidate::from_element(el, score))
        .filter(|c| {
            let selector = c.selector.trim();
            !selector.is_empty() && !DEGENERATE_SELECTORS.contains(&selector)
        })
        .enumerate()
        .map(|(i, mut c)| {
            c.id = i;
            c
        })
        .collect()
}

/// Relevance of `element` to `intent` in `0.0..=1.0`; zero means no match.
///
/// An empty intent matches everything with a flat score of 1.
pub fn score_element(intent: &str, element: &RawElement) -> f64 {
    let intent = intent.trim().to_lowercase();
    if intent.is_empty() {
        return 1.0;
    }

    let fields: Vec<String> = [
        &element.text,
        &element.aria_label,
        &element.placeholder,
        &element.title,
        &element.name,
        &element.value,
        &element.alt,
    ]
    .iter()
    .map(|f| f.trim().to_lowercase())
    .filter(|f| !f.is_empty())
    .collect();
    if fields.is_empty() {
        return 0.0;
    }
    let combined = fields.join(" ");

    let mut variants = vec![intent.clone()];
    if let Some(alt) = transliterate(&intent) {
        variants.push(alt.to_string());
    }
    let base = variants
        .iter()
        .map(|v| text_score(v, &fields, &combined))
        .fold(0.0, f64::max);
    if base <= 0.0 {
        return 0.0;
    }

    let role = element.role.to_lowercase();
    let mut score = base;
    if intent.contains("button") && role.contains("button") {
        score += ROLE_BONUS;
    }
    if intent.contains("input") && role.contains("input") {
        score += ROLE_BONUS;
    }
    if intent.contains("link") && (role.contains("link") || role == "a") {
        score += ROLE_BONUS;
    }
    if element.in_viewport {
        score += VIEWPORT_BONUS;
    }
    score.min(1.0)
}

fn text_score(intent: &str, fields: &[String], combined: &str) -> f64 {
    if fields.iter().any(|f| f == intent) {
        return EXACT_MATCH_SCORE;
    }
    if fields.iter().any(|f| f.contains(intent)) {
        return CONTAINS_INTENT_SCORE;
    }
    let intent_seq: Vec<&str> = intent.split_whitespace().collect();
    if fields.iter().any(|f| is_word_run(f, &intent_seq)) {
        return CONTAINED_IN_INTENT_SCORE;
    }

    let intent_words: HashSet<&str> = intent_seq.iter().copied().collect();
    if intent_words.is_empty() {
        return 0.0;
    }
    let text_words: HashSet<&str> = combined.split_whitespace().collect();
    let overlap = intent_words.intersection(&text_words).count();
    overlap as f64 / intent_words.len() as f64 * WORD_OVERLAP_WEIGHT
}

/// Whether the words of `field` appear back to back inside `intent_words`.
fn is_word_run(field: &str, intent_words: &[&str]) -> bool {
    let field_words: Vec<&str> = field.split_whitespace().collect();
    !field_words.is_empty()
        && intent_words
            .windows(field_words.len())
            .any(|window| window == field_words.as_slice())
}

/// Alternate-script spelling of a known brand name.
pub fn transliterate(intent: &str) -> Option<&'static str> {
    let intent = intent.trim().to_lowercase();
    TRANSLITERATIONS
        .iter()
        .find(|(from, _)| *from == intent)
        .map(|(_, to)| *to)
}

#[cfg(test)]
#[path = "candidates_tests.rs"]
mod tests;
