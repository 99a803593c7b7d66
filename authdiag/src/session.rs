//! Browser sessions: one token store and its subscriptions per set of
//! credentials.
//!
//! Sessions live in a bounded cache. An idle or evicted session has its
//! subscriptions cancelled; the next request with the same credentials starts
//! a new one.

use crate::identity::{IdentitySource, IdentityView};
use crate::token::{Credentials, TokenSource, TokenStore};
use log::{debug, info};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Token store and subscriptions of one browser session.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: TokenStore,
    pub identity: IdentityView,
    /// SSH key extension, when enabled.
    pub extension: Option<IdentityView>,
}

impl Session {
    fn close(&self) {
        self.identity.shutdown();
        if let Some(extension) = &self.extension {
            extension.shutdown();
        }
    }
}

/// Where sessions get their data from.
#[derive(Clone)]
pub struct SessionSources {
    pub tokens: Arc<dyn TokenSource>,
    pub identity: Arc<dyn IdentitySource>,
    pub extension: Option<Arc<dyn IdentitySource>>,
}

/// Session registry keyed by browser credentials.
#[derive(Clone)]
pub struct Sessions {
    cache: Cache<Credentials, Session>,
    sources: SessionSources,
    shutdown: CancellationToken,
}

impl Sessions {
    pub fn new(
        sources: SessionSources,
        max_sessions: u64,
        idle: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(idle)
            .eviction_listener(|_credentials, session: Session, cause| {
                debug!("Closing session ({:?})", cause);
                session.close();
            })
            .build();
        Self {
            cache,
            sources,
            shutdown,
        }
    }

    /// Returns the session for `credentials`, opening it on first use.
    ///
    /// Opening a session fetches its first token before returning; concurrent
    /// callers with the same credentials wait for that fetch instead of
    /// starting their own. The flag is `true` for the caller that opened it.
    pub async fn open(&self, credentials: Credentials) -> (Session, bool) {
        let init = self.create(credentials.clone());
        let entry = self.cache.entry(credentials).or_insert_with(init).await;
        let fresh = entry.is_fresh();
        (entry.into_value(), fresh)
    }

    /// The session for `credentials`, if one is open.
    pub async fn get(&self, credentials: &Credentials) -> Option<Session> {
        self.cache.get(credentials).await
    }

    async fn create(&self, credentials: Credentials) -> Session {
        let anonymous = credentials.cookie().is_none();
        let tokens = TokenStore::new(Arc::clone(&self.sources.tokens), credentials);
        let identity = IdentityView::spawn(
            tokens.subscribe(),
            Arc::clone(&self.sources.identity),
            self.shutdown.child_token(),
        );
        let extension = self.sources.extension.as_ref().map(|source| {
            IdentityView::spawn(
                tokens.subscribe(),
                Arc::clone(source),
                self.shutdown.child_token(),
            )
        });

        info!(
            "Opening {} session",
            if anonymous { "anonymous" } else { "browser" }
        );
        tokens.get_token().await;

        Session {
            tokens,
            identity,
            extension,
        }
    }
}
