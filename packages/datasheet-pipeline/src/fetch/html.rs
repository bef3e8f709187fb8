//! HTML text helpers shared by the fetch strategies.
//!
//! Regex-based on purpose: the strategies only need visible text, a
//! title, and a handful of structural signals, not a full DOM.

use regex::Regex;
use serde_json::Value;

use crate::config::{DYNAMIC_MIN_ELEMENTS, DYNAMIC_SCRIPT_COUNT, EMPTY_BODY_LEN};

/// Strip an HTML document down to its visible text.
pub fn strip_tags(html: &str) -> String {
    let script = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let noscript = Regex::new(r"(?is)<noscript[^>]*>.*?</noscript>").unwrap();
    let comment = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let block_end =
        Regex::new(r"(?i)</(?:p|div|li|tr|h[1-6]|section|article|table|ul|ol)>|<br\s*/?>").unwrap();
    let tag = Regex::new(r"<[^>]+>").unwrap();

    let mut text = script.replace_all(html, " ").to_string();
    text = style.replace_all(&text, " ").to_string();
    text = noscript.replace_all(&text, " ").to_string();
    text = comment.replace_all(&text, " ").to_string();
    text = block_end.replace_all(&text, "\n").to_string();
    text = tag.replace_all(&text, " ").to_string();

    collapse_whitespace(&decode_entities(&text))
}

/// Extract the document title.
pub fn extract_title(html: &str) -> Option<String> {
    let title = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap();
    title
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| collapse_whitespace(&decode_entities(m.as_str())))
        .filter(|t| !t.is_empty())
}

/// Classify a raw document as a client-framework shell that needs
/// rendering before its content is visible.
///
/// Signals, any of which trips the classifier:
/// - an empty root-mount element or framework mount attribute
/// - few elements combined with many script tags
/// - a near-empty `<body>`
pub fn looks_dynamic(html: &str) -> bool {
    let mount = Regex::new(
        r#"(?is)<(?:div|main)[^>]*\bid\s*=\s*["'](?:root|app|__next|__nuxt)["'][^>]*>\s*</(?:div|main)>"#,
    )
    .unwrap();
    if mount.is_match(html) {
        return true;
    }

    let marker = Regex::new(r#"(?i)data-reactroot|data-v-app|\bng-app\b"#).unwrap();
    if marker.is_match(html) {
        return true;
    }

    let element = Regex::new(r"<[a-zA-Z][^>]*>").unwrap();
    let script = Regex::new(r"(?i)<script\b").unwrap();
    let element_count = element.find_iter(html).count();
    let script_count = script.find_iter(html).count();
    if element_count < DYNAMIC_MIN_ELEMENTS && script_count > DYNAMIC_SCRIPT_COUNT {
        return true;
    }

    let body = Regex::new(r"(?is)<body[^>]*>(.*?)</body>").unwrap();
    if let Some(cap) = body.captures(html) {
        let body_text = strip_tags(cap.get(1).map(|m| m.as_str()).unwrap_or(""));
        if body_text.chars().count() < EMPTY_BODY_LEN {
            return true;
        }
    }

    false
}

/// Pull text out of inline script payloads without executing anything:
/// JSON blocks (`application/json`, `application/ld+json`) and
/// serialized state assignments (`window.__STATE__ = {...};`).
pub fn mine_script_payloads(html: &str) -> String {
    let mut collected = Vec::new();

    let json_block =
        Regex::new(r#"(?is)<script[^>]*type\s*=\s*["']application/(?:ld\+)?json["'][^>]*>(.*?)</script>"#)
            .unwrap();
    for cap in json_block.captures_iter(html) {
        if let Some(payload) = cap.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(payload.as_str().trim()) {
                collect_strings(&value, &mut collected);
            }
        }
    }

    let state_assign =
        Regex::new(r"(?s)window\.__[A-Z0-9_]+__\s*=\s*(\{.*?\})\s*;").unwrap();
    for cap in state_assign.captures_iter(html) {
        if let Some(payload) = cap.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(payload.as_str()) {
                collect_strings(&value, &mut collected);
            }
        }
    }

    collected.join("\n")
}

/// Walk a JSON value collecting every string leaf, keyed ones as
/// "key: value" lines so property-style payloads survive mining.
fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                if let Value::String(s) = nested {
                    let s = s.trim();
                    if !s.is_empty() {
                        out.push(format!("{}: {}", key, s));
                    }
                } else {
                    collect_strings(nested, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn collapse_whitespace(text: &str) -> String {
    let horizontal = Regex::new(r"[ \t]+").unwrap();
    let around_newline = Regex::new(r"[ \t]*\n[ \t]*").unwrap();
    let multi_newline = Regex::new(r"\n{3,}").unwrap();

    let text = horizontal.replace_all(text, " ");
    let text = around_newline.replace_all(&text, "\n");
    let text = multi_newline.replace_all(&text, "\n\n");
    text.trim().to_string()
}
