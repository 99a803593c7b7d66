use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to send request: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Response error (status {0}): {1}")]
    ResponseError(u16, String),

    #[error("Failed to deserialize response: {0}")]
    DeserializationError(String),

    #[error("Invalid credentials header: {0}")]
    InvalidCredentials(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}
