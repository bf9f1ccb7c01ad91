//! In-page JavaScript used by the CDP driver.
//!
//! Every script is a single expression suitable for `Runtime.evaluate`.
//! Strings from Rust are embedded as JSON literals.

/// Shared element lookup. Understands plain CSS, `tag:has-text("..")`,
/// `xpath=..` and `POSITION_FALLBACK:(x,y)`.
const FIND_ELEMENT: &str = r#"
const __wpVisible = (el) => {
  const r = el.getBoundingClientRect();
  const s = window.getComputedStyle(el);
  return r.width > 0 && r.height > 0 && s.display !== 'none' &&
    s.visibility !== 'hidden' && parseFloat(s.opacity || '1') >= 0.1;
};
const __wpFind = (sel) => {
  if (sel.startsWith('POSITION_FALLBACK:')) {
    const m = sel.match(/\((-?[\d.]+)\s*,\s*(-?[\d.]+)\)/);
    return m ? document.elementFromPoint(Number(m[1]) + 1, Number(m[2]) + 1) : null;
  }
  if (sel.startsWith('xpath=')) {
    return document.evaluate(sel.slice(6), document, null,
      XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue;
  }
  const ht = sel.match(/^(.*?):has-text\("((?:[^"\\]|\\.)*)"\)$/);
  if (ht) {
    const needle = ht[2].replace(/\\(.)/g, '$1').toLowerCase();
    const pool = Array.from(document.querySelectorAll(ht[1] || '*'))
      .filter((el) => (el.innerText || el.textContent || '').toLowerCase().includes(needle));
    return pool.find(__wpVisible) || pool[0] || null;
  }
  const all = Array.from(document.querySelectorAll(sel));
  return all.find(__wpVisible) || all[0] || null;
};
"#;

/// Collects visible interactive elements as `RawElement` objects.
pub const ENUMERATE_ELEMENTS: &str = r#"(() => {
  const SELECTORS = [
    'a[href]', 'button', 'input', 'textarea', 'select',
    '[role="button"]', '[role="link"]', '[role="menuitem"]', '[role="tab"]',
    '[role="checkbox"]', '[role="radio"]', '[onclick]', '[tabindex]:not([tabindex="-1"])',
    '[class*="product"]', '[class*="Product"]', '[class*="card"]', '[class*="Card"]',
    '[class*="item"]', '[class*="Item"]', '[data-product]', '[data-item]', 'article'
  ];
  const BAG = ['data-testid', 'data-qa', 'data-test', 'aria-label', 'name', 'type', 'href'];
  const seen = new Set();
  const out = [];
  const vw = window.innerWidth, vh = window.innerHeight;

  const chain = (el) => {
    const items = [];
    let node = el;
    while (node && node.nodeType === 1 && items.length < 5) {
      const tag = node.tagName.toLowerCase();
      if (tag === 'body' || tag === 'html') break;
      const parent = node.parentElement;
      let nth = 1, same = 1;
      if (parent) {
        const sibs = Array.from(parent.children).filter((c) => c.tagName === node.tagName);
        same = sibs.length;
        nth = sibs.indexOf(node) + 1;
      }
      items.push({
        tag,
        classes: Array.from(node.classList || []),
        nth_of_type: nth,
        same_tag_siblings: same,
      });
      node = parent;
    }
    return items.reverse();
  };

  for (const el of document.querySelectorAll(SELECTORS.join(','))) {
    if (seen.has(el)) continue;
    seen.add(el);
    const r = el.getBoundingClientRect();
    if (r.width <= 0 || r.height <= 0) continue;
    const s = window.getComputedStyle(el);
    if (s.display === 'none' || s.visibility === 'hidden') continue;
    if (parseFloat(s.opacity || '1') < 0.1) continue;

    const tag = el.tagName.toLowerCase();
    const explicitRole = el.getAttribute('role');
    let role = explicitRole || tag;
    if (!explicitRole && tag === 'input') role = 'input[' + (el.type || 'text') + ']';

    const attributes = {};
    for (const name of BAG) {
      const v = el.getAttribute(name);
      if (v) attributes[name] = v;
    }

    out.push({
      tag,
      role,
      explicit_role: !!explicitRole,
      text: (el.innerText || el.textContent || '').trim().slice(0, 200),
      aria_label: el.getAttribute('aria-label') || '',
      placeholder: el.getAttribute('placeholder') || '',
      title: el.getAttribute('title') || '',
      name: el.getAttribute('name') || '',
      value: typeof el.value === 'string' ? el.value.slice(0, 100) : '',
      alt: el.getAttribute('alt') || '',
      id: el.id || '',
      input_type: tag === 'input' ? (el.type || 'text') : '',
      attributes,
      bbox: {
        x: Math.round(r.left), y: Math.round(r.top),
        width: Math.round(r.width), height: Math.round(r.height),
      },
      ancestors: chain(el),
      in_viewport: r.top >= 0 && r.left >= 0 && r.bottom <= vh && r.right <= vw,
    });
  }
  return out;
})()"#;

/// Whether the focused element accepts text input.
pub const INPUT_FOCUSED: &str = r#"(() => {
  const el = document.activeElement;
  if (!el) return false;
  const tag = el.tagName.toLowerCase();
  return tag === 'input' || tag === 'textarea' || el.isContentEditable === true;
})()"#;

/// Scroll offset and page dimensions.
pub const SCROLL_POSITION: &str = r#"({
  offset: window.scrollY,
  total_height: Math.max(document.body ? document.body.scrollHeight : 0,
    document.documentElement.scrollHeight),
  viewport_height: window.innerHeight,
})"#;

/// Viewport dimensions, used to aim wheel events at the centre.
pub const VIEWPORT_SIZE: &str = "({ width: window.innerWidth, height: window.innerHeight })";

/// Resolve `selector`, scroll it into view and report its state.
///
/// Returns `{found, visible, x, y}` where `x`/`y` is the element centre.
pub fn locate(selector: &str) -> String {
    format!(
        r#"(() => {{ {find}
  const el = __wpFind({sel});
  if (!el) return {{ found: false, visible: false, x: 0, y: 0 }};
  el.scrollIntoView({{ block: 'center', inline: 'center' }});
  const r = el.getBoundingClientRect();
  return {{ found: true, visible: __wpVisible(el), x: r.left + r.width / 2, y: r.top + r.height / 2 }};
}})()"#,
        find = FIND_ELEMENT,
        sel = js_string(selector)
    )
}

/// Focus `selector` and optionally clear its current value.
pub fn focus(selector: &str, clear: bool) -> String {
    format!(
        r#"(() => {{ {find}
  const el = __wpFind({sel});
  if (!el) return false;
  el.focus();
  if ({clear}) {{
    if ('value' in el) {{
      el.value = '';
      el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    }} else if (el.isContentEditable) {{
      el.textContent = '';
    }}
  }}
  return true;
}})()"#,
        find = FIND_ELEMENT,
        sel = js_string(selector),
        clear = clear
    )
}

/// Visible body text cut to `max_len` characters.
pub fn visible_text(max_len: usize) -> String {
    format!(
        "(document.body ? document.body.innerText : '').slice(0, {})",
        max_len
    )
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_embeds_selector_as_literal() {
        let script = locate(r#"[aria-label="Say \"hi\""]"#);
        assert!(script.contains(r#"__wpFind("[aria-label=\"Say \\\"hi\\\"\"]")"#));
    }

    #[test]
    fn test_focus_clear_flag() {
        assert!(focus("#q", true).contains("if (true)"));
        assert!(focus("#q", false).contains("if (false)"));
    }

    #[test]
    fn test_visible_text_cap() {
        assert_eq!(
            visible_text(2000),
            "(document.body ? document.body.innerText : '').slice(0, 2000)"
        );
    }

    #[test]
    fn test_enumeration_emits_snake_case_fields() {
        for field in ["explicit_role", "aria_label", "in_viewport", "nth_of_type", "same_tag_siblings"] {
            assert!(ENUMERATE_ELEMENTS.contains(field), "missing {}", field);
        }
    }
}
