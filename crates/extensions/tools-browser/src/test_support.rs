//! In-memory browser driver for unit tests.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use webpilot_protocols::{BoundingBox, BrowserDriver, BrowserError, RawElement};

/// Records every call; selectors listed in `missing` fail with "not found".
#[derive(Default)]
pub struct MockDriver {
    pub calls: Mutex<Vec<String>>,
    pub elements: Mutex<Vec<RawElement>>,
    pub url: Mutex<String>,
    pub missing: Mutex<HashSet<String>>,
}

impl MockDriver {
    pub fn with_elements(elements: Vec<RawElement>) -> Self {
        Self {
            elements: Mutex::new(elements),
            url: Mutex::new("https://shop.example/".to_string()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn check(&self, selector: &str) -> Result<(), BrowserError> {
        if self.missing.lock().contains(selector) {
            return Err(BrowserError::ElementNotFound(selector.to_string()));
        }
        Ok(())
    }
}

/// A visible element with the given text, tag and vertical position.
pub fn raw(tag: &str, text: &str, y: f64) -> RawElement {
    RawElement {
        tag: tag.to_string(),
        role: tag.to_string(),
        text: text.to_string(),
        bbox: BoundingBox::new(10.0, y, 120.0, 30.0),
        in_viewport: true,
        ..Default::default()
    }
}

/// Same as [`raw`] with a `data-testid` so the selector is predictable.
pub fn raw_with_test_id(tag: &str, text: &str, y: f64, test_id: &str) -> RawElement {
    let mut el = raw(tag, text, y);
    el.attributes = BTreeMap::from([("data-testid".to_string(), test_id.to_string())]);
    el
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.record(format!("navigate:{}", url));
        *self.url.lock() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.url.lock().clone())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok("Mock page".to_string())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.record(format!("click:{}", selector));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, clear: bool) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.record(format!("type:{}:{}:{}", selector, text, clear));
        Ok(())
    }

    async fn press_key(&self, keys: &str) -> Result<(), BrowserError> {
        self.record(format!("press:{}", keys));
        Ok(())
    }

    async fn scroll(&self, delta_y: i64) -> Result<(), BrowserError> {
        self.record(format!("scroll:{}", delta_y));
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), BrowserError> {
        self.check(selector)?;
        self.record(format!("hover:{}", selector));
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.record("back".to_string());
        Ok(())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<(), BrowserError> {
        self.record(format!("screenshot:{}:{}", path.display(), full_page));
        Ok(())
    }

    async fn visible_text(&self, max_len: usize) -> Result<String, BrowserError> {
        Ok("Mock page text".chars().take(max_len).collect())
    }

    async fn interactive_elements(&self) -> Result<Vec<RawElement>, BrowserError> {
        Ok(self.elements.lock().clone())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, BrowserError> {
        Ok(Value::Null)
    }

    async fn close_popups(&self) -> Result<bool, BrowserError> {
        self.record("close_popups".to_string());
        Ok(false)
    }
}
