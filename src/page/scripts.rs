//! Expressions evaluated inside an element's own frame.
//!
//! Every element script looks the element up by its identity selector and
//! yields `null` when it is not attached.

use crate::dom::locator::Locator;
use serde_json::Value;

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn with_element(locator: &Locator, body: &str) -> String {
    format!(
        "(function () {{ const el = document.querySelector({}); if (!el) {{ return null; }} {} }})()",
        js_string(&locator.css()),
        body
    )
}

/// `{x, y, width, height, visible}` in top-level page coordinates, iframe offsets included
pub fn bounding_box(locator: &Locator, scroll_into_view: bool) -> String {
    let scroll = if scroll_into_view { "el.scrollIntoView({ block: 'center', inline: 'center' });" } else { "" };
    with_element(
        locator,
        &format!(
            "{} const r = el.getBoundingClientRect(); let x = r.left; let y = r.top; let w = window; \
             while (w.frameElement) {{ const f = w.frameElement.getBoundingClientRect(); x += f.left; y += f.top; w = w.parent; }} \
             const visible = typeof el.checkVisibility === 'function' ? el.checkVisibility() : r.width > 0 && r.height > 0; \
             return {{ x: x, y: y, width: r.width, height: r.height, visible: visible }};",
            scroll
        ),
    )
}

pub fn dispatch_click(locator: &Locator) -> String {
    with_element(
        locator,
        "el.dispatchEvent(new MouseEvent('click', { bubbles: true, cancelable: true, view: window })); return true;",
    )
}

pub fn dispatch_hover(locator: &Locator) -> String {
    with_element(
        locator,
        "for (const type of ['mouseover', 'mouseenter', 'mousemove']) { \
         el.dispatchEvent(new MouseEvent(type, { bubbles: true, cancelable: true, view: window })); } return true;",
    )
}

pub fn focus(locator: &Locator) -> String {
    with_element(locator, "el.focus(); return true;")
}

/// Focus the element and empty its current value
pub fn clear_value(locator: &Locator) -> String {
    with_element(
        locator,
        "el.focus(); if ('value' in el) { el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); } \
         else if (el.isContentEditable) { el.textContent = ''; } return true;",
    )
}

/// Assign a value directly and fire `input` and `change`
pub fn set_value(locator: &Locator, value: &str) -> String {
    with_element(
        locator,
        &format!(
            "const v = {}; if ('value' in el) {{ el.value = v; }} else {{ el.textContent = v; }} \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true;",
            js_string(value)
        ),
    )
}

pub fn outer_html(locator: &Locator) -> String {
    with_element(locator, "return el.outerHTML;")
}

pub fn highlight(locator: &Locator, duration_ms: u64) -> String {
    with_element(
        locator,
        &format!(
            "const previous = el.style.outline; el.style.outline = '3px solid #ff3e3e'; \
             setTimeout(() => {{ el.style.outline = previous; }}, {}); return true;",
            duration_ms
        ),
    )
}

/// Scroll by `increment` pixels; yields `{scrollY, atBottom}`
pub fn scroll_step(increment: u32) -> String {
    format!(
        "(function () {{ window.scrollBy(0, {}); const root = document.scrollingElement || document.documentElement; \
         return {{ scrollY: window.scrollY, atBottom: window.innerHeight + window.scrollY >= root.scrollHeight - 1 }}; }})()",
        increment
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_is_quoted() {
        let script = outer_html(&Locator::top("a\"b"));
        assert!(script.contains(r#"document.querySelector("[d-id=\"a\\\"b\"]")"#));
    }

    #[test]
    fn test_value_is_a_string_literal() {
        let script = set_value(&Locator::top("x"), "it's \"quoted\"\n");
        assert!(script.contains(r#"const v = "it's \"quoted\"\n";"#));
    }
}
