//! HTML views of the diagnostic page.
//!
//! Every view renders to a `String` fragment; [`Layout`] assembles them into a
//! complete document.

pub mod highlight;
mod layout;
mod nav;
mod panels;

pub use layout::Layout;
pub use nav::{Navigation, GET_TOKEN_ACTION};
pub use panels::{extension_panel, identity_panel, token_panel, JsonPanel};

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
