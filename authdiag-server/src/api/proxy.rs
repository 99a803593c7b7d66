use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{
        header::{self, HeaderName},
        HeaderMap, HeaderValue, Method, Request, Response, StatusCode,
    },
    response::IntoResponse,
};
use std::error::Error as StdError;
use thiserror::Error;

use crate::state::AppState;

/// Hop-by-hop headers are meaningful for one connection only and are never forwarded
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

#[derive(Error, Debug)]
pub(crate) enum ForwardError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(Method),

    #[error("Failed to read request body")]
    RequestBody(#[source] axum::Error),

    #[error("Request timed out while connecting to backend server")]
    Timeout(#[source] reqwest::Error),

    #[error("Connection error occurred while connecting to backend server")]
    Connect(#[source] reqwest::Error),

    #[error("Failed to send request: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Failed to read response body")]
    ResponseBody(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ForwardError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if e.is_connect() {
            Self::Connect(e)
        } else {
            Self::Request(e)
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            Self::UnsupportedMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, self.to_string()).into_response()
    }
}

/// Forward requests under the configured prefixes to the backend, returning
/// its response verbatim. Redirects are passed through to the browser.
pub(super) async fn forward_to_backend(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response<Body>, ForwardError> {
    let method = match *req.method() {
        Method::GET => reqwest::Method::GET,
        Method::POST => reqwest::Method::POST,
        Method::PUT => reqwest::Method::PUT,
        Method::DELETE => reqwest::Method::DELETE,
        Method::PATCH => reqwest::Method::PATCH,
        Method::HEAD => reqwest::Method::HEAD,
        Method::OPTIONS => reqwest::Method::OPTIONS,
        _ => {
            log::error!("Unsupported HTTP method: {}", req.method());
            return Err(ForwardError::UnsupportedMethod(req.method().clone()));
        }
    };

    let path = req
        .uri()
        .path_and_query()
        .map(|path| path.to_string())
        .unwrap_or_default();
    let url = state.settings.get_backend_url(path);
    log::debug!("Forwarding request to backend: {} {}", req.method(), url);

    let headers = forwarded_request_headers(req.headers(), backend_origin(&state));

    let body_bytes = to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(ForwardError::RequestBody)?;

    let mut req_builder = state.proxy_client.request(method, &url).headers(headers);
    if !body_bytes.is_empty() {
        req_builder = req_builder.body(body_bytes);
    }

    let response = req_builder.send().await.map_err(|e| {
        log::error!(
            "Failed to forward request: {} ({:?})\nURL: {}\nSource error: {:?}",
            e,
            e.status(),
            url,
            e.source()
        );
        ForwardError::from(e)
    })?;

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.bytes().await.map_err(|e| {
        log::error!("Failed to read response body: {}", e);
        ForwardError::ResponseBody(e)
    })?;

    let mut resp = Response::new(Body::from(bytes));
    *resp.status_mut() = status;

    // append, not insert: several Set-Cookie headers must all reach the browser
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        resp.headers_mut().append(name.clone(), value.clone());
    }

    Ok(resp)
}

/// The backend origin to present in the Origin header, when origin rewriting is enabled
fn backend_origin(state: &AppState) -> Option<HeaderValue> {
    if !state.settings.proxy.change_origin {
        return None;
    }
    let origin = state.settings.backend().ok()?.origin().ascii_serialization();
    HeaderValue::from_str(&origin).ok()
}

/// Request headers for the backend. With an origin to present, Host is left
/// for the client to derive from the backend URL; otherwise the browser's
/// Host is forwarded unchanged.
fn forwarded_request_headers(headers: &HeaderMap, origin: Option<HeaderValue>) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name) || name == header::CONTENT_LENGTH {
            continue;
        }
        if name == header::HOST && origin.is_some() {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    if let Some(origin) = origin {
        forwarded.insert(header::ORIGIN, origin);
    }
    forwarded
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}
