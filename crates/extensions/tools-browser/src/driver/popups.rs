//! Best-effort overlay dismissal.

use std::time::Duration;

use tracing::debug;

use webpilot_protocols::{BrowserDriver, BrowserError};

use crate::dom::rank_candidates;

/// Intents searched for close controls, with their result limits.
const CLOSE_QUERIES: [(&str, usize); 3] = [("close", 5), ("dismiss", 3), ("cancel", 3)];

/// Text that marks a candidate as a close control.
const CLOSE_KEYWORDS: [&str; 6] = ["close", "dismiss", "cancel", "x", "закрыть", "отмена"];

const AFTER_CLICK: Duration = Duration::from_millis(500);
const AFTER_ESCAPE: Duration = Duration::from_millis(300);

/// Click anything that looks like a close button, then press Escape.
///
/// Click failures are ignored. Returns whether at least one click landed.
pub async fn dismiss_popups<D>(driver: &D) -> Result<bool, BrowserError>
where
    D: BrowserDriver + ?Sized,
{
    let elements = driver.interactive_elements().await?;

    let mut candidates = Vec::new();
    for (query, limit) in CLOSE_QUERIES {
        candidates.extend(rank_candidates(query, elements.clone(), limit));
    }

    let mut closed = false;
    for candidate in candidates {
        let label = format!("{}{}", candidate.text, candidate.aria_label).to_lowercase();
        if !CLOSE_KEYWORDS.iter().any(|kw| label.contains(kw)) {
            continue;
        }
        match driver.click(&candidate.selector).await {
            Ok(()) => {
                debug!("Closed popup via {}", candidate.selector);
                closed = true;
                tokio::time::sleep(AFTER_CLICK).await;
            }
            Err(e) => debug!("Popup close click failed on {}: {}", candidate.selector, e),
        }
    }

    if driver.press_key("Escape").await.is_ok() {
        tokio::time::sleep(AFTER_ESCAPE).await;
    }

    Ok(closed)
}
