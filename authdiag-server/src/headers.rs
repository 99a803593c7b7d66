use axum::http::HeaderValue;
use axum::response::Response;
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};

/// Marks a response as never cacheable. Pages carry token material, so neither
/// browsers nor intermediaries may keep a copy.
pub fn no_store<B>(response: &mut Response<B>) {
    let headers = response.headers_mut();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate, private"),
    );
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(EXPIRES, HeaderValue::from_static("0"));
}
