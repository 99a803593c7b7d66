use crate::error::FetchError;
use log::debug;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

/// Builds the HTTP client shared by the token and identity sources.
pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(2)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .build()?;
    Ok(client)
}

/// Sends `request` and decodes a JSON body of any shape.
///
/// A JSON `null` body decodes to `None`. Non-success statuses and bodies that
/// are not JSON are errors.
pub(crate) async fn fetch_json(request: RequestBuilder) -> Result<Option<Value>, FetchError> {
    let response = request
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(FetchError::ResponseError(status.as_u16(), body));
    }

    let bytes = response.bytes().await?;
    debug!("Received {} byte JSON body ({})", bytes.len(), status);
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(FetchError::DeserializationError(e.to_string())),
    }
}
