//! Raw element data returned by the driver.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rounded rendered bounds of an element, in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// One step of an element's ancestry, nearest-last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAncestor {
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// 1-based position among siblings with the same tag.
    #[serde(default = "default_nth")]
    pub nth_of_type: usize,
    /// Number of siblings sharing the tag, this element included.
    #[serde(default = "default_nth")]
    pub same_tag_siblings: usize,
}

fn default_nth() -> usize {
    1
}

/// Attribute bag for one visible interactive element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawElement {
    /// Lowercase tag name.
    pub tag: String,
    /// Explicit `role` attribute or a role derived from the tag.
    pub role: String,
    /// Whether `role` came from an explicit attribute.
    pub explicit_role: bool,
    pub text: String,
    pub aria_label: String,
    pub placeholder: String,
    pub title: String,
    pub name: String,
    pub value: String,
    pub alt: String,
    pub id: String,
    pub input_type: String,
    /// Stable attributes (`data-testid`, `data-qa`, `data-test`, `href`, ...).
    pub attributes: BTreeMap<String, String>,
    pub bbox: BoundingBox,
    /// Ancestors from the top of the kept chain down to the element itself.
    pub ancestors: Vec<ElementAncestor>,
    pub in_viewport: bool,
}

/// Vertical scroll state of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub offset: f64,
    pub total_height: f64,
    pub viewport_height: f64,
}

impl ScrollPosition {
    /// Fraction of the page scrolled past, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let scrollable = self.total_height - self.viewport_height;
        if scrollable <= 0.0 {
            return 1.0;
        }
        (self.offset / scrollable).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_center() {
        let bbox = BoundingBox::new(10.0, 20.0, 100.0, 40.0);
        assert_eq!(bbox.center(), (60.0, 40.0));
        assert!(!bbox.is_empty());
        assert!(BoundingBox::default().is_empty());
    }

    #[test]
    fn test_raw_element_deserializes_partial() {
        let el: RawElement = serde_json::from_value(serde_json::json!({
            "tag": "button",
            "role": "button",
            "text": "Add to cart",
            "attributes": {"data-testid": "add"},
            "bbox": {"x": 1.0, "y": 2.0, "width": 3.0, "height": 4.0},
            "ancestors": [{"tag": "div", "classes": ["card"]}],
            "in_viewport": true
        }))
        .unwrap();
        assert_eq!(el.tag, "button");
        assert_eq!(el.attributes["data-testid"], "add");
        assert_eq!(el.ancestors[0].nth_of_type, 1);
        assert!(el.placeholder.is_empty());
        assert!(el.in_viewport);
    }

    #[test]
    fn test_scroll_progress() {
        let pos = ScrollPosition {
            offset: 500.0,
            total_height: 2000.0,
            viewport_height: 1000.0,
        };
        assert_eq!(pos.progress(), 0.5);

        let short = ScrollPosition {
            offset: 0.0,
            total_height: 800.0,
            viewport_height: 1000.0,
        };
        assert_eq!(short.progress(), 1.0);
    }
}
