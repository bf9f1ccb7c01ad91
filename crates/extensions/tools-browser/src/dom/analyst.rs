//! Single-candidate selection on top of the ranked candidate list.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use webpilot_protocols::{ChatRequest, LLMProvider, Message, RawElement};

use super::candidates::{Candidate, score_element};

const HIGH_CONFIDENCE: f64 = 0.8;
const LOW_CONFIDENCE: f64 = 0.5;
const LLM_CONFIDENCE: f64 = 0.7;
const FALLBACK_CONFIDENCE: f64 = 0.3;
const LLM_MAX_CANDIDATES: usize = 8;
const ANALYST_SYSTEM_PROMPT: &str = "You are a DOM element selector. Be concise.";

/// The analyst's pick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalystSelection {
    pub candidate_id: usize,
    pub selector: String,
    pub confidence: f64,
    pub reason: String,
}

/// Picks the candidate that best matches a query.
///
/// Confident heuristic matches are taken directly. Ambiguous sets go to the
/// model when one is attached, otherwise the top heuristic match wins.
#[derive(Clone, Default)]
pub struct CandidateAnalyst {
    llm: Option<Arc<dyn LLMProvider>>,
}

impl CandidateAnalyst {
    pub fn new() -> Self {
        Self { llm: None }
    }

    /// Attach a model for tie-breaking.
    pub fn with_llm(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm: Some(llm) }
    }

    pub async fn select(&self, query: &str, candidates: &[Candidate]) -> Option<AnalystSelection> {
        let mut scored: Vec<(f64, &Candidate)> = candidates
            .iter()
            .map(|c| (heuristic_score(query, c), c))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let (best_score, best) = *scored.first()?;

        if best_score > HIGH_CONFIDENCE {
            debug!(query, id = best.id, "High confidence heuristic match");
            return Some(selection(best, best_score, "High confidence heuristic match"));
        }

        if scored.len() > 1 && best_score < LOW_CONFIDENCE {
            debug!(query, "Ambiguous candidates, asking model");
            return self.llm_select(query, candidates).await;
        }

        Some(selection(best, best_score, "Best heuristic match"))
    }

    async fn llm_select(&self, query: &str, candidates: &[Candidate]) -> Option<AnalystSelection> {
        let first = candidates.first()?;
        let fallback = || Some(selection(first, FALLBACK_CONFIDENCE, "Fallback to first candidate"));

        let Some(llm) = &self.llm else {
            return fallback();
        };

        let request = ChatRequest::new(vec![Message::user(tie_break_prompt(query, candidates))])
            .with_system(ANALYST_SYSTEM_PROMPT);
        let reply = match llm.chat(request).await {
            Ok(response) => response.content_text().trim().to_lowercase(),
            Err(e) => {
                warn!("Candidate analyst model call failed: {}", e);
                return fallback();
            }
        };

        if reply == "none" {
            return None;
        }

        match parse_index(&reply).and_then(|i| candidates.get(i)) {
            Some(candidate) => Some(selection(candidate, LLM_CONFIDENCE, "LLM selection")),
            None => fallback(),
        }
    }
}

/// Field scorer applied to the fields a candidate carries.
fn heuristic_score(query: &str, candidate: &Candidate) -> f64 {
    let element = RawElement {
        tag: candidate.tag.clone(),
        role: candidate.role.clone(),
        text: candidate.text.clone(),
        aria_label: candidate.aria_label.clone(),
        placeholder: candidate.placeholder.clone(),
        name: candidate.name.clone(),
        in_viewport: candidate.in_viewport,
        ..Default::default()
    };
    score_element(query, &element)
}

fn selection(candidate: &Candidate, confidence: f64, reason: &str) -> AnalystSelection {
    AnalystSelection {
        candidate_id: candidate.id,
        selector: candidate.selector.clone(),
        confidence,
        reason: reason.to_string(),
    }
}

fn tie_break_prompt(query: &str, candidates: &[Candidate]) -> String {
    let lines: Vec<String> = candidates
        .iter()
        .take(LLM_MAX_CANDIDATES)
        .enumerate()
        .map(|(i, c)| {
            let text: String = c.text.chars().take(50).collect();
            let mut line = format!("[{}] {}: \"{}\"", i, c.role, text);
            if !c.aria_label.is_empty() {
                line.push_str(&format!(" aria-label=\"{}\"", c.aria_label));
            }
            if !c.placeholder.is_empty() {
                line.push_str(&format!(" placeholder=\"{}\"", c.placeholder));
            }
            line
        })
        .collect();

    format!(
        "Select the element that best matches: \"{}\"\n\nCandidates:\n{}\n\nReply with just the number (e.g., \"0\" or \"2\") or \"none\" if no match.",
        query,
        lines.join("\n")
    )
}

/// First run of digits in the reply.
fn parse_index(reply: &str) -> Option<usize> {
    let digits: String = reply
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
