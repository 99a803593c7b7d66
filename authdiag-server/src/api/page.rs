use crate::headers::no_store;
use crate::state::AppState;
use authdiag::render::{extension_panel, identity_panel, token_panel, Layout, Navigation};
use authdiag::{Credentials, Token};
use axum::{
    extract::{OriginalUri, State},
    http::{header::COOKIE, header::HOST, HeaderMap, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use log::debug;

/// Renders the diagnostic page for any client-side route
pub(super) async fn render_page(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Unsupported HTTP method: {}", method),
        )
            .into_response();
    }

    // Each browser session has its own token; a new one fetches once
    let credentials = Credentials::from_cookie(headers.get(COOKIE));
    let (session, fresh) = state.sessions.open(credentials).await;
    if fresh {
        debug!("Opened session for new browser credentials");
    }

    let wait = state.settings.render_wait();
    let token = session.tokens.token();
    let subject = token.as_ref().and_then(Token::access_token);
    let identity = session.identity.settled(subject, wait).await;
    let extension = match &session.extension {
        Some(view) => Some(view.settled(subject, wait).await),
        None => None,
    };

    let page_url = page_url(&headers, &uri);
    let base_path = state.settings.base_path();
    let navigation = Navigation {
        page_url: &page_url,
        base_path: &base_path,
    };

    let html = Layout::new(&state.settings.title)
        .section(navigation.render())
        .section(token_panel(token.as_ref()).render())
        .section(identity_panel(identity.as_ref()).render());
    let html = match extension {
        Some(extension) => html.section(extension_panel(extension.as_ref()).render()),
        None => html,
    }
    .render();

    let mut response = Html(html).into_response();
    no_store(&mut response);
    response
}

/// Reconstructs the URL the browser has in its address bar
pub(crate) fn page_url(headers: &HeaderMap, uri: &Uri) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(HOST))
        .and_then(|value| value.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .unwrap_or("localhost");
    let path = uri
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or("/");
    format!("{}://{}{}", scheme, host, path)
}
