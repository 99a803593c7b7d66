//! Identity subscription: follows the token store and keeps the identity
//! record for the current access token.

use crate::client::fetch_json;
use crate::error::FetchError;
use crate::token::TokenState;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default identity endpoint (Microsoft Graph "me").
pub const DEFAULT_IDENTITY_URL: &str = "https://graph.microsoft.com/v1.0/me";

/// User profile record returned by the identity endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Identity(Value);

impl Identity {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Looks up the identity behind `access_token`.
    async fn fetch(&self, access_token: &str) -> Result<Option<Identity>, FetchError>;
}

/// Fetches identities with a bearer token.
#[derive(Debug, Clone)]
pub struct BearerIdentitySource {
    client: Client,
    url: Url,
}

impl BearerIdentitySource {
    pub fn new(client: Client, url: Url) -> Self {
        Self { client, url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl IdentitySource for BearerIdentitySource {
    async fn fetch(&self, access_token: &str) -> Result<Option<Identity>, FetchError> {
        let request = self.client.get(self.url.clone()).bearer_auth(access_token);
        Ok(fetch_json(request).await?.map(Identity))
    }
}

/// Identity state published by the subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityState {
    /// Bumped on every distinct access token.
    pub generation: u64,
    /// The access token the state belongs to.
    pub subject: Option<String>,
    /// A fetch for `subject` is in flight.
    pub pending: bool,
    pub identity: Option<Identity>,
}

/// Handle to the running identity subscription.
#[derive(Debug, Clone)]
pub struct IdentityView {
    receiver: watch::Receiver<IdentityState>,
    shutdown: CancellationToken,
}

impl IdentityView {
    /// Starts following `tokens`.
    ///
    /// The subscription reacts once per distinct access token string: a new
    /// string triggers one fetch, a missing one clears the identity without a
    /// request. Responses for superseded tokens are discarded.
    pub fn spawn(
        tokens: watch::Receiver<TokenState>,
        source: Arc<dyn IdentitySource>,
        shutdown: CancellationToken,
    ) -> Self {
        let (state, receiver) = watch::channel(IdentityState::default());
        tokio::spawn(run_subscription(
            tokens,
            source,
            Arc::new(state),
            shutdown.clone(),
        ));
        Self { receiver, shutdown }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.receiver.borrow().identity.clone()
    }

    pub fn state(&self) -> IdentityState {
        self.receiver.borrow().clone()
    }

    /// Waits until the subscription has settled on `subject` and returns its
    /// identity.
    ///
    /// Gives up after `wait`, returning whatever is known for `subject` by then.
    pub async fn settled(&self, subject: Option<&str>, wait: Duration) -> Option<Identity> {
        let mut receiver = self.receiver.clone();
        let settled = timeout(
            wait,
            receiver.wait_for(|state| state.subject.as_deref() == subject && !state.pending),
        )
        .await;

        match settled {
            Ok(Ok(state)) => state.identity.clone(),
            Ok(Err(_)) => {
                warn!("Identity subscription is no longer running");
                None
            }
            Err(_) => {
                debug!("Identity did not settle within {:?}", wait);
                let state = self.receiver.borrow();
                if state.subject.as_deref() == subject {
                    state.identity.clone()
                } else {
                    None
                }
            }
        }
    }

    /// Stops the subscription and any fetch it has in flight.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn run_subscription(
    mut tokens: watch::Receiver<TokenState>,
    source: Arc<dyn IdentitySource>,
    state: Arc<watch::Sender<IdentityState>>,
    shutdown: CancellationToken,
) {
    let mut subject: Option<String> = None;
    let mut generation = 0u64;

    loop {
        let next = {
            let current = tokens.borrow_and_update();
            match &current.token {
                Some(token) => {
                    let access_token = token.access_token().map(str::to_owned);
                    if access_token.is_none() {
                        debug!("Token #{} carries no access_token", current.seq);
                    }
                    access_token
                }
                None => None,
            }
        };

        if next != subject {
            subject = next;
            generation += 1;
            state.send_replace(IdentityState {
                generation,
                subject: subject.clone(),
                pending: subject.is_some(),
                identity: None,
            });

            match &subject {
                Some(access_token) => spawn_fetch(
                    access_token.clone(),
                    generation,
                    Arc::clone(&source),
                    Arc::clone(&state),
                    shutdown.clone(),
                ),
                None => debug!("Identity cleared (generation {})", generation),
            }
        }

        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Identity subscription shutting down");
                break;
            }
            changed = tokens.changed() => {
                if changed.is_err() {
                    info!("Token store dropped, identity subscription ends");
                    break;
                }
            }
        }
    }
}

fn spawn_fetch(
    access_token: String,
    generation: u64,
    source: Arc<dyn IdentitySource>,
    state: Arc<watch::Sender<IdentityState>>,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let identity = tokio::select! {
            _ = shutdown.cancelled() => return,
            result = source.fetch(&access_token) => match result {
                Ok(identity) => identity,
                Err(e) => {
                    warn!("Identity request (generation {}) failed: {}", generation, e);
                    None
                }
            },
        };

        let applied = state.send_if_modified(|current| {
            if current.generation != generation {
                return false;
            }
            current.pending = false;
            current.identity = identity;
            true
        });
        if applied {
            debug!("Identity updated (generation {})", generation);
        } else {
            debug!(
                "Discarding identity response for superseded token (generation {})",
                generation
            );
        }
    });
}
