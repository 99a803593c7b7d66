//! The token store: token state of one browser session and the `get_token()`
//! action.
//!
//! The store is an explicit handle bound to the session's credentials.
//! Consumers either read the current value with [`TokenStore::token`] or
//! subscribe to changes through a [`tokio::sync::watch`] receiver.

use crate::client::fetch_json;
use crate::error::FetchError;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::{COOKIE, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use url::Url;

/// Credential object returned by the backend token endpoint.
///
/// The shape is not validated; the body is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Token(Value);

impl Token {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The bearer string, when the token carries one.
    pub fn access_token(&self) -> Option<&str> {
        self.0.get("access_token").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Browser credentials forwarded to the token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Credentials {
    cookie: Option<HeaderValue>,
}

impl Credentials {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_cookie(cookie: Option<&HeaderValue>) -> Self {
        Self {
            cookie: cookie.cloned(),
        }
    }

    /// Parses a raw `Cookie` header value.
    pub fn parse_cookie(cookie: &str) -> Result<Self, FetchError> {
        let value = HeaderValue::from_str(cookie)
            .map_err(|e| FetchError::InvalidCredentials(e.to_string()))?;
        Ok(Self {
            cookie: Some(value),
        })
    }

    pub fn cookie(&self) -> Option<&HeaderValue> {
        self.cookie.as_ref()
    }
}

/// Where tokens come from
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Fetches the current token. `Ok(None)` means the endpoint answered with
    /// no token at all.
    async fn fetch(&self, credentials: &Credentials) -> Result<Option<Token>, FetchError>;
}

/// Fetches tokens from the backend's `/auth/token` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    client: Client,
    url: Url,
}

impl HttpTokenSource {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    /// Resolves `path` against the backend origin.
    pub fn for_backend(client: Client, backend: &Url, path: &str) -> Result<Self, FetchError> {
        Ok(Self::new(client, backend.join(path)?))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch(&self, credentials: &Credentials) -> Result<Option<Token>, FetchError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(cookie) = credentials.cookie() {
            request = request.header(COOKIE, cookie.clone());
        }
        Ok(fetch_json(request).await?.map(Token))
    }
}

/// Snapshot of the store as seen by subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenState {
    /// Sequence number of the request whose response is applied (0 before any).
    pub seq: u64,
    pub token: Option<Token>,
}

/// Shared handle to the token state of one session.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn TokenSource>,
    credentials: Credentials,
    requested: AtomicU64,
    state: watch::Sender<TokenState>,
}

impl TokenStore {
    /// Creates an empty store that fetches with `credentials`.
    pub fn new(source: Arc<dyn TokenSource>, credentials: Credentials) -> Self {
        let (state, _) = watch::channel(TokenState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                credentials,
                requested: AtomicU64::new(0),
                state,
            }),
        }
    }

    /// The current token, if any.
    pub fn token(&self) -> Option<Token> {
        self.inner.state.borrow().token.clone()
    }

    pub fn state(&self) -> TokenState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TokenState> {
        self.inner.state.subscribe()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    /// Fetches a fresh token and replaces the stored one with the response.
    ///
    /// Any failure stores `None`. Each call takes a sequence number and its
    /// result is applied only if no newer call has applied one already, so
    /// overlapping calls settle on the newest request. Returns the token held
    /// by the store once this call's result has been applied or discarded.
    pub async fn get_token(&self) -> Option<Token> {
        let seq = self.inner.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let token = match self.inner.source.fetch(&self.inner.credentials).await {
            Ok(Some(token)) => {
                info!("Token request #{} succeeded", seq);
                Some(token)
            }
            Ok(None) => {
                info!("Token request #{} returned no token", seq);
                None
            }
            Err(e) => {
                warn!("Token request #{} failed: {}", seq, e);
                None
            }
        };

        let applied = self.inner.state.send_if_modified(|state| {
            if seq <= state.seq {
                return false;
            }
            state.seq = seq;
            state.token = token;
            true
        });
        if !applied {
            debug!(
                "Discarding response of token request #{}: a newer one is applied",
                seq
            );
        }

        self.token()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("state", &*self.inner.state.borrow())
            .field("requested", &self.inner.requested.load(Ordering::SeqCst))
            .finish()
    }
}
