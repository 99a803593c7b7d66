use super::escape_html;
use url::form_urlencoded;

/// Path of the form action behind the `getToken()` button.
pub const GET_TOKEN_ACTION: &str = "/_authdiag/get_token";

const SIGN_IN_PATH: &str = "/auth/sign_in";
const SIGN_OUT_PATH: &str = "/auth/sign_out";
const TOKEN_PATH: &str = "/auth/token";

/// Navigation view: route links plus the sign-in/sign-out/token actions.
#[derive(Debug, Clone, Copy)]
pub struct Navigation<'a> {
    /// Absolute URL of the page being rendered.
    pub page_url: &'a str,
    /// Base path the page is mounted under ("" for the root).
    pub base_path: &'a str,
}

impl Navigation<'_> {
    /// Route links as (href, label) pairs. All but the first are relative to
    /// the current page.
    pub fn routes(&self) -> Vec<(String, &'static str)> {
        vec![
            (format!("{}/", self.base_path.trim_end_matches('/')), "/"),
            ("..".to_string(), ".."),
            ("A/".to_string(), "A"),
            ("B/".to_string(), "B"),
            ("C/".to_string(), "C"),
        ]
    }

    pub fn sign_in_href(&self) -> String {
        self.with_redirect(SIGN_IN_PATH)
    }

    pub fn sign_out_href(&self) -> String {
        self.with_redirect(SIGN_OUT_PATH)
    }

    fn with_redirect(&self, path: &str) -> String {
        let redirect: String = form_urlencoded::byte_serialize(self.page_url.as_bytes()).collect();
        format!("{}?redirect={}", path, redirect)
    }

    pub fn render(&self) -> String {
        let routes = self
            .routes()
            .into_iter()
            .map(|(href, label)| {
                format!(
                    r#"<a class="button" href="{}">{}</a>"#,
                    escape_html(&href),
                    escape_html(label)
                )
            })
            .collect::<Vec<_>>()
            .join("\n    ");

        format!(
            r#"<section class="paper" id="navigation">
  <h6 class="title">Navigation</h6>
  <p>
    {routes}
  </p>
  <p>
    <a class="button primary" href="{sign_in}">{sign_in_label}</a>
    <a class="button primary" href="{sign_out}">{sign_out_label}</a>
    <a class="button primary" href="{token}">{token}</a>
    <form class="inline" method="post" action="{action}">
      <input type="hidden" name="redirect" value="{page_url}">
      <button class="button primary" type="submit">getToken()</button>
    </form>
  </p>
</section>"#,
            routes = routes,
            sign_in = escape_html(&self.sign_in_href()),
            sign_in_label = SIGN_IN_PATH,
            sign_out = escape_html(&self.sign_out_href()),
            sign_out_label = SIGN_OUT_PATH,
            token = TOKEN_PATH,
            action = GET_TOKEN_ACTION,
            page_url = escape_html(self.page_url),
        )
    }
}
