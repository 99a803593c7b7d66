//! JSON syntax highlighting for the display panels.
//!
//! The highlighter wraps tokens of already formatted JSON text in `<span>`
//! elements. Stripping the tags and unescaping the entities gives back the
//! input text unchanged.

use super::escape_html;
use serde_json::Value;

/// Formats `value` with 2-space indentation.
pub fn pretty(value: &Value) -> String {
    // Serializing a `Value` cannot fail
    serde_json::to_string_pretty(value).unwrap_or_default()
}

/// Renders `value` as an indented, highlighted `<pre>` block.
pub fn json_block(value: &Value) -> String {
    format!(
        r#"<pre class="json"><code>{}</code></pre>"#,
        highlight(&pretty(value))
    )
}

/// Highlights formatted JSON text.
pub fn highlight(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        let len = match c {
            '"' => {
                let len = string_len(rest);
                let class = if is_key(&rest[len..]) { "key" } else { "string" };
                push_span(&mut out, class, &rest[..len]);
                len
            }
            '-' | '0'..='9' => {
                let len = rest
                    .find(|c: char| !matches!(c, '0'..='9' | '-' | '+' | '.' | 'e' | 'E'))
                    .unwrap_or(rest.len());
                push_span(&mut out, "number", &rest[..len]);
                len
            }
            't' | 'f' | 'n' => {
                let len = ["true", "false", "null"]
                    .iter()
                    .find(|literal| rest.starts_with(*literal))
                    .map(|literal| literal.len())
                    .unwrap_or(c.len_utf8());
                push_span(&mut out, "literal", &rest[..len]);
                len
            }
            '{' | '}' | '[' | ']' | ':' | ',' => {
                push_span(&mut out, "punct", &rest[..1]);
                1
            }
            _ => {
                out.push_str(&escape_html(&rest[..c.len_utf8()]));
                c.len_utf8()
            }
        };
        rest = &rest[len..];
    }

    out
}

/// Length in bytes of the string literal at the start of `text`, quotes included.
fn string_len(text: &str) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return i + 1,
            _ => {}
        }
    }
    text.len()
}

fn is_key(after: &str) -> bool {
    after.trim_start().starts_with(':')
}

fn push_span(out: &mut String, class: &str, token: &str) {
    out.push_str(r#"<span class="hl-"#);
    out.push_str(class);
    out.push_str(r#"">"#);
    out.push_str(&escape_html(token));
    out.push_str("</span>");
}
