use super::escape_html;
use super::highlight::{json_block, pretty};
use crate::identity::Identity;
use crate::token::Token;
use serde_json::Value;

/// A titled panel showing one JSON value, or nothing when the value is absent.
#[derive(Debug, Clone, Copy)]
pub struct JsonPanel<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub value: Option<&'a Value>,
}

impl JsonPanel<'_> {
    /// The formatted text shown in the panel body.
    pub fn text(&self) -> Option<String> {
        self.value.map(pretty)
    }

    pub fn render(&self) -> String {
        let body = self.value.map(json_block).unwrap_or_default();
        format!(
            r#"<section class="paper" id="{id}">
  <h6 class="title">{title}</h6>
  {body}
</section>"#,
            id = escape_html(self.id),
            title = escape_html(self.title),
            body = body,
        )
    }
}

/// Token display view
pub fn token_panel(token: Option<&Token>) -> JsonPanel<'_> {
    JsonPanel {
        id: "token",
        title: "Token",
        value: token.map(Token::as_value),
    }
}

/// Identity display view
pub fn identity_panel(identity: Option<&Identity>) -> JsonPanel<'_> {
    JsonPanel {
        id: "identity",
        title: "ID",
        value: identity.map(Identity::as_value),
    }
}

/// SSH key extension view
pub fn extension_panel(extension: Option<&Identity>) -> JsonPanel<'_> {
    JsonPanel {
        id: "ssh-keys",
        title: "SSH keys",
        value: extension.map(Identity::as_value),
    }
}
