use crate::config::Settings;
use crate::errors::StartupError;
use authdiag::{
    build_client, BearerIdentitySource, Credentials, ExtensionSource, HttpTokenSource,
    IdentitySource, SessionSources, Sessions,
};
use log::{info, warn};
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Sessions,
    pub proxy_client: Arc<Client>,
    shutdown: CancellationToken,
}

impl AppState {
    fn create_proxy_client(timeout: Duration) -> Result<Client, reqwest::Error> {
        // The browser must see the backend's redirects, so never follow them here
        Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .redirect(Policy::none())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
    }

    /// Builds the session registry and prepares the proxy client
    pub fn new(settings: Settings) -> Result<Self, StartupError> {
        let client = build_client(settings.client_timeout())?;

        let token_source =
            HttpTokenSource::for_backend(client.clone(), &settings.backend()?, &settings.token_path)?;
        info!("Token endpoint: {}", token_source.url());

        let identity_url = Url::parse(&settings.identity_url)?;
        let extension_source = settings.extension().map(|name| {
            let source = ExtensionSource::new(client.clone(), &identity_url, name);
            info!("SSH key extension: {} ({})", name, source.url());
            Arc::new(source) as Arc<dyn IdentitySource>
        });
        let identity_source = BearerIdentitySource::new(client, identity_url);
        info!("Identity endpoint: {}", identity_source.url());

        let shutdown = CancellationToken::new();
        let sessions = Sessions::new(
            SessionSources {
                tokens: Arc::new(token_source),
                identity: Arc::new(identity_source),
                extension: extension_source,
            },
            settings.max_sessions,
            settings.session_idle(),
            shutdown.child_token(),
        );

        let proxy_client = Arc::new(Self::create_proxy_client(settings.client_timeout())?);

        Ok(Self {
            settings: Arc::new(settings),
            sessions,
            proxy_client,
            shutdown,
        })
    }

    /// Opens the anonymous session in the background, fetching its first token
    pub fn bootstrap(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        tokio::spawn(async move {
            let (session, _) = sessions.open(Credentials::none()).await;
            if session.tokens.token().is_none() {
                warn!("No token available at startup; sign in and reload the page");
            }
        })
    }

    /// Stops background work
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
