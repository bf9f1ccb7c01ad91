//! Compact page observations for the prompt.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use webpilot_protocols::{BrowserDriver, BrowserError, ScrollPosition};
use webpilot_tools_browser::driver::scripts::{INPUT_FOCUSED, SCROLL_POSITION};

/// Characters of visible text kept in the summary.
pub const SUMMARY_LENGTH: usize = 500;

/// Snapshot of the page at the start of an iteration.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub url: String,
    pub title: String,
    pub visible_text_summary: String,
    pub screenshot_path: Option<PathBuf>,
    pub has_input_focused: bool,
    pub scroll_position: ScrollPosition,
    pub timestamp: DateTime<Utc>,
}

impl Observation {
    /// One fact per line, as sent to the model.
    pub fn to_prompt_text(&self) -> String {
        let mut lines = vec![
            format!("URL: {}", self.url),
            format!("Title: {}", self.title),
            format!("Page summary: {}", self.visible_text_summary),
        ];
        if let Some(path) = &self.screenshot_path {
            lines.push(format!("Screenshot saved: {}", path.display()));
        }
        if self.has_input_focused {
            lines.push("Note: An input field is currently focused".to_string());
        }
        lines.push(format!(
            "Scroll: {:.0}px from top, page height: {:.0}px",
            self.scroll_position.offset, self.scroll_position.total_height
        ));
        lines.join("\n")
    }
}

/// Builds observations from a driver.
pub struct Observer {
    driver: Arc<dyn BrowserDriver>,
    screenshots_dir: Option<PathBuf>,
    max_text_length: usize,
    screenshot_counter: AtomicU32,
}

impl Observer {
    pub fn new(driver: Arc<dyn BrowserDriver>, max_text_length: usize) -> Self {
        Self {
            driver,
            screenshots_dir: None,
            max_text_length,
            screenshot_counter: AtomicU32::new(0),
        }
    }

    /// Save a numbered `step_NNNN.png` into `dir` on every observation.
    pub fn with_screenshots_dir(mut self, dir: PathBuf) -> Self {
        self.screenshots_dir = Some(dir);
        self
    }

    pub async fn observe(&self, take_screenshot: bool) -> Result<Observation, BrowserError> {
        let url = self.driver.current_url().await?;
        let title = self.driver.title().await?;
        let text = self.driver.visible_text(self.max_text_length).await?;

        let has_input_focused = match self.driver.evaluate(INPUT_FOCUSED).await {
            Ok(value) => value.as_bool().unwrap_or(false),
            Err(e) => {
                debug!("Focus check failed: {}", e);
                false
            }
        };
        let scroll_position = match self.driver.evaluate(SCROLL_POSITION).await {
            Ok(value) => serde_json::from_value(value).unwrap_or_default(),
            Err(e) => {
                debug!("Scroll position check failed: {}", e);
                ScrollPosition::default()
            }
        };

        let screenshot_path = if take_screenshot {
            self.take_screenshot().await
        } else {
            None
        };

        Ok(Observation {
            url,
            title,
            visible_text_summary: summarize(&text, SUMMARY_LENGTH),
            screenshot_path,
            has_input_focused,
            scroll_position,
            timestamp: Utc::now(),
        })
    }

    async fn take_screenshot(&self) -> Option<PathBuf> {
        let dir = self.screenshots_dir.as_ref()?;
        let n = self.screenshot_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let path = dir.join(format!("step_{:04}.png", n));
        match self.driver.screenshot(&path, false).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Observation screenshot failed: {}", e);
                None
            }
        }
    }
}

/// Normalise whitespace and cut to `max_len`, preferring a sentence end.
pub fn summarize(text: &str, max_len: usize) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max_len {
        return text;
    }

    let truncated: Vec<char> = text.chars().take(max_len).collect();
    let sentence_end = truncated.iter().rposition(|c| matches!(c, '.' | '?' | '!'));
    match sentence_end {
        Some(end) if end * 2 > max_len => truncated[..=end].iter().collect(),
        _ => {
            let mut cut: String = truncated.into_iter().collect();
            cut.push_str("...");
            cut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockDriver;
    use serde_json::json;

    #[test]
    fn test_summarize_short_text() {
        assert_eq!(summarize("  Hello\n\n  world\t! ", 500), "Hello world !");
    }

    #[test]
    fn test_summarize_cuts_at_sentence_end() {
        let text = format!("{}. {}", "a".repeat(300), "b".repeat(400));
        let summary = summarize(&text, 500);
        assert_eq!(summary, format!("{}.", "a".repeat(300)));
    }

    #[test]
    fn test_summarize_appends_ellipsis_without_late_sentence_end() {
        let text = format!("{}. {}", "a".repeat(100), "b".repeat(600));
        let summary = summarize(&text, 500);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), 503);
    }

    #[test]
    fn test_prompt_text() {
        let observation = Observation {
            url: "https://shop.example/".to_string(),
            title: "Shop".to_string(),
            visible_text_summary: "Welcome".to_string(),
            screenshot_path: Some(PathBuf::from("runs/x/screenshots/step_0001.png")),
            has_input_focused: true,
            scroll_position: ScrollPosition {
                offset: 120.0,
                total_height: 3000.0,
                viewport_height: 900.0,
            },
            timestamp: Utc::now(),
        };
        assert_eq!(
            observation.to_prompt_text(),
            "URL: https://shop.example/\nTitle: Shop\nPage summary: Welcome\n\
             Screenshot saved: runs/x/screenshots/step_0001.png\n\
             Note: An input field is currently focused\n\
             Scroll: 120px from top, page height: 3000px"
        );
    }

    #[tokio::test]
    async fn test_observe_reads_driver_state() {
        let driver = Arc::new(MockDriver::default());
        driver.set_evaluate(INPUT_FOCUSED, json!(true));
        driver.set_evaluate(
            SCROLL_POSITION,
            json!({"offset": 50.0, "total_height": 2000.0, "viewport_height": 800.0}),
        );
        let observer = Observer::new(driver.clone(), 2000);

        let observation = observer.observe(false).await.unwrap();
        assert_eq!(observation.url, "https://shop.example/");
        assert!(observation.has_input_focused);
        assert_eq!(observation.scroll_position.total_height, 2000.0);
        assert!(observation.screenshot_path.is_none());
    }

    #[tokio::test]
    async fn test_observe_numbers_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let driver = Arc::new(MockDriver::default());
        let observer = Observer::new(driver.clone(), 2000).with_screenshots_dir(dir.path().to_path_buf());

        let first = observer.observe(true).await.unwrap();
        let second = observer.observe(true).await.unwrap();
        assert_eq!(first.screenshot_path, Some(dir.path().join("step_0001.png")));
        assert_eq!(second.screenshot_path, Some(dir.path().join("step_0002.png")));
        assert_eq!(driver.count_calls("screenshot"), 2);

        // Without a directory nothing is taken.
        let bare = Observer::new(driver.clone(), 2000);
        assert!(bare.observe(true).await.unwrap().screenshot_path.is_none());
        assert_eq!(driver.count_calls("screenshot"), 2);
    }
}
