//! Selector synthesis.
//!
//! A synthesized selector is an opaque string the driver can resolve back to
//! one element. Plain CSS is preferred; `tag:has-text("..")`, `xpath=..` and
//! `POSITION_FALLBACK:(x,y)` are driver extensions.

use webpilot_protocols::{ElementAncestor, RawElement};

/// Attributes that test suites and accessibility tooling keep stable.
pub const STABLE_ATTRIBUTES: [&str; 3] = ["data-testid", "data-qa", "data-test"];

/// Prefix of the last-resort position selector.
pub const POSITION_FALLBACK_PREFIX: &str = "POSITION_FALLBACK:";

/// Ancestors kept in CSS and XPath chains.
pub const MAX_PATH_DEPTH: usize = 4;

const LABEL_MAX_CHARS: usize = 50;
const HAS_TEXT_MAX_CHARS: usize = 40;

/// Substrings found in framework-generated ids.
const GENERATED_ID_MARKERS: [&str; 8] = ["react-", "ember", "vue-", ":r", ":R", "uid-", "id-", "el-"];

/// Class prefixes emitted by CSS-in-JS tooling and BEM modifiers.
const UTILITY_CLASS_PREFIXES: [&str; 6] = ["css-", "sc-", "emotion-", "jsx-", "svelte-", "__"];

/// Build a selector for `element`, first match wins. Never returns an empty string.
pub fn synthesize_selector(element: &RawElement) -> String {
    for attr in STABLE_ATTRIBUTES.iter().copied().chain(["aria-label", "name"]) {
        if let Some(value) = non_blank(element.attributes.get(attr).map(String::as_str)) {
            return attribute_selector(attr, value);
        }
    }
    if let Some(label) = non_blank(Some(&element.aria_label)) {
        return attribute_selector("aria-label", &truncate_chars(label, LABEL_MAX_CHARS));
    }
    if let Some(name) = non_blank(Some(&element.name)) {
        return attribute_selector("name", name);
    }

    if !element.id.is_empty() && is_stable_id(&element.id) {
        return format!("#{}", escape_css_id(&element.id));
    }

    if let Some(placeholder) = non_blank(Some(&element.placeholder)) {
        return attribute_selector("placeholder", &truncate_chars(placeholder, LABEL_MAX_CHARS));
    }

    if element.explicit_role {
        if let (Some(role), Some(title)) = (non_blank(Some(&element.role)), non_blank(Some(&element.title))) {
            return format!(
                "{}[title=\"{}\"]",
                attribute_selector("role", role),
                escape_css_value(&truncate_chars(title, LABEL_MAX_CHARS))
            );
        }
    }

    let css_path = build_css_path(&element.ancestors, MAX_PATH_DEPTH);
    if !css_path.is_empty() {
        return css_path;
    }

    let tag = element.tag.trim().to_lowercase();
    if !tag.is_empty() {
        if let Some(text) = non_blank(Some(&element.text)) {
            return has_text_selector(&tag, text);
        }
        if tag == "input" {
            let input_type = non_blank(Some(&element.input_type))
                .or_else(|| non_blank(element.attributes.get("type").map(String::as_str)))
                .unwrap_or("text");
            return format!("input[type=\"{}\"]", escape_css_value(input_type));
        }
        return tag;
    }

    position_fallback(element)
}

/// Rebuild a usable selector for an element whose synthesized one was a
/// position fallback. Tries label, placeholder, name, text, css path, tag.
pub fn regenerate_selector(
    tag: &str,
    aria_label: &str,
    placeholder: &str,
    name: &str,
    text: &str,
    css_path: &str,
) -> Option<String> {
    if let Some(label) = non_blank(Some(aria_label)) {
        return Some(attribute_selector("aria-label", &truncate_chars(label, LABEL_MAX_CHARS)));
    }
    if let Some(placeholder) = non_blank(Some(placeholder)) {
        return Some(attribute_selector("placeholder", &truncate_chars(placeholder, LABEL_MAX_CHARS)));
    }
    if let Some(name) = non_blank(Some(name)) {
        return Some(attribute_selector("name", name));
    }
    let tag = tag.trim().to_lowercase();
    if let (false, Some(text)) = (tag.is_empty(), non_blank(Some(text))) {
        return Some(has_text_selector(&tag, text));
    }
    if let Some(path) = non_blank(Some(css_path)) {
        return Some(path.to_string());
    }
    (!tag.is_empty() && tag != "body" && tag != "html").then_some(tag)
}

/// CSS chain over the last `max_depth` ancestors: tag, first meaningful
/// class, and `:nth-of-type(n)` when same-tag siblings exist.
pub fn build_css_path(ancestors: &[ElementAncestor], max_depth: usize) -> String {
    let start = ancestors.len().saturating_sub(max_depth);
    ancestors[start..]
        .iter()
        .map(|ancestor| {
            let mut part = tag_or_div(&ancestor.tag);
            if let Some(class) = ancestor
                .classes
                .iter()
                .find(|c| !is_utility_class(c) && c.chars().count() < 30)
            {
                part.push('.');
                part.push_str(class);
            }
            if ancestor.same_tag_siblings > 1 {
                part.push_str(&format!(":nth-of-type({})", ancestor.nth_of_type.max(1)));
            }
            part
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

/// XPath equivalent of [`build_css_path`], `tag[n]` per non-unique sibling.
pub fn build_xpath(ancestors: &[ElementAncestor], max_depth: usize) -> String {
    if ancestors.is_empty() {
        return String::new();
    }
    let start = ancestors.len().saturating_sub(max_depth);
    let parts: Vec<String> = ancestors[start..]
        .iter()
        .map(|ancestor| {
            let tag = tag_or_div(&ancestor.tag);
            if ancestor.same_tag_siblings > 1 {
                format!("{}[{}]", tag, ancestor.nth_of_type.max(1))
            } else {
                tag
            }
        })
        .collect();
    format!("//{}", parts.join("/"))
}

/// Escape a value for a double-quoted attribute selector.
pub fn escape_css_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', " ")
}

/// Escape an id for use after `#`: a leading digit becomes a code point
/// escape and colons are backslash-escaped.
pub fn escape_css_id(id: &str) -> String {
    let mut chars = id.chars();
    let escaped = match chars.next() {
        Some(first) if first.is_ascii_digit() => format!("\\3{} {}", first, chars.as_str()),
        _ => id.to_string(),
    };
    escaped.replace(':', "\\:")
}

/// Whether an id looks hand-written rather than framework-generated.
pub fn is_stable_id(id: &str) -> bool {
    if id.is_empty() || GENERATED_ID_MARKERS.iter().any(|m| id.contains(m)) {
        return false;
    }
    let alphanumeric = id.chars().filter(|c| c.is_alphanumeric()).count();
    let numeric = id.chars().filter(|c| c.is_numeric()).count();
    !(alphanumeric > 0 && numeric as f64 / alphanumeric as f64 > 0.5)
}

/// Whether a class name looks generated or purely presentational.
pub fn is_utility_class(class: &str) -> bool {
    if UTILITY_CLASS_PREFIXES.iter().any(|p| class.starts_with(p)) {
        return true;
    }
    let len = class.chars().count();
    if !(2..=40).contains(&len) {
        return true;
    }
    let digits = class.chars().filter(|c| c.is_numeric()).count();
    digits as f64 > len as f64 / 2.0
}

fn attribute_selector(attr: &str, value: &str) -> String {
    format!("[{}=\"{}\"]", attr, escape_css_value(value))
}

fn has_text_selector(tag: &str, text: &str) -> String {
    format!(
        "{}:has-text(\"{}\")",
        tag,
        escape_css_value(&truncate_chars(text, HAS_TEXT_MAX_CHARS))
    )
}

fn position_fallback(element: &RawElement) -> String {
    format!(
        "{}({},{})",
        POSITION_FALLBACK_PREFIX,
        element.bbox.x.round() as i64,
        element.bbox.y.round() as i64
    )
}

fn tag_or_div(tag: &str) -> String {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() { "div".to_string() } else { tag }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
