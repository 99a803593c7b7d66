pub(crate) use crate::config::proxy::ProxyConfig;
use authdiag::{DEFAULT_EXTENSION_NAME, DEFAULT_IDENTITY_URL};
use config::{Config as ConfigCrate, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub mod proxy;

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "AUTHDIAG_CONFIG";

/// Main configuration structure for the diagnostic server
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    /// The port the server will listen to (default: 3000)
    pub port: u16,

    /// Title shown in the application bar (default: "authdiag")
    pub title: String,

    /// Base path the page is mounted under (default: "")
    pub public_url: String,

    /// Backend origin serving /auth/* and /api/* (default: http://localhost:8080)
    pub backend_url: String,

    /// Token endpoint path on the backend (default: /auth/token)
    pub token_path: String,

    /// Identity endpoint queried with the bearer token
    pub identity_url: String,

    /// Open extension holding the SSH public keys; empty disables the panel
    /// (default: dev.l0w.ssh_public_keys)
    pub extension_name: String,

    /// Maximum number of browser sessions kept at once (default: 1000)
    pub max_sessions: u64,

    /// Seconds after which an unused session is dropped (default: 1800)
    pub session_idle_secs: u64,

    /// Timeout for outbound requests in seconds (default: 30)
    pub client_timeout: u64,

    /// Maximum time a page render waits for the identity, in milliseconds (default: 5000)
    pub render_wait_ms: u64,

    /// Development proxy configuration
    pub proxy: ProxyConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: 3000,
            title: "authdiag".to_string(),
            public_url: "".to_string(),
            backend_url: "http://localhost:8080".to_string(),
            token_path: "/auth/token".to_string(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            extension_name: DEFAULT_EXTENSION_NAME.to_string(),
            max_sessions: 1000,
            session_idle_secs: 1800,
            client_timeout: 30,
            render_wait_ms: 5000,
            proxy: ProxyConfig::default(),
        }
    }
}

impl Settings {
    /// Creates a new Settings instance from the optional config file and
    /// `AUTHDIAG_*` environment variables (nested keys use `__`, e.g.
    /// `AUTHDIAG_PROXY__ENABLED`)
    pub fn new() -> Result<Self, String> {
        let mut builder = ConfigCrate::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(File::with_name(&path));
        }
        builder
            .add_source(
                Environment::with_prefix("AUTHDIAG")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e: ConfigError| e.to_string())?
            .try_deserialize()
            .map_err(|e| e.to_string())
    }

    /// The backend origin as a URL
    pub fn backend(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.backend_url)
    }

    /// Returns a properly formatted URL to the backend with the given path
    pub fn get_backend_url<S: Into<String>>(&self, path: S) -> String {
        let path = path.into();
        let origin = self.backend_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", origin, path)
        } else {
            format!("{}/{}", origin, path)
        }
    }

    /// Base path of the page without a trailing slash ("" for the root)
    pub fn base_path(&self) -> String {
        let path = match Url::parse(&self.public_url) {
            Ok(url) => url.path().to_string(),
            Err(_) => self.public_url.clone(),
        };
        let path = path.trim_matches('/');
        if path.is_empty() {
            String::new()
        } else {
            format!("/{}", path)
        }
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_millis(self.render_wait_ms)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    /// The extension to show, if the panel is enabled
    pub fn extension(&self) -> Option<&str> {
        let name = self.extension_name.trim();
        (!name.is_empty()).then_some(name)
    }

    #[cfg(test)]
    pub fn for_test_with_mocks(
        backend_mock: &wiremock::MockServer,
        identity_mock: &wiremock::MockServer,
    ) -> Self {
        Self {
            port: 0, // Let the OS choose a port
            title: "authdiag test".to_string(),
            public_url: "".to_string(),
            backend_url: backend_mock.uri(),
            token_path: "/auth/token".to_string(),
            identity_url: format!("{}/v1.0/me", identity_mock.uri()),
            extension_name: String::new(),
            max_sessions: 100,
            session_idle_secs: 60,
            client_timeout: 5,
            render_wait_ms: 2000,
            proxy: ProxyConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for (name, _value) in std::env::vars() {
            if name.starts_with("AUTHDIAG_") {
                std::env::remove_var(name);
            }
        }
    }

    // Environment variables are process-wide, so every env-based assertion
    // lives in this one test.
    #[test]
    fn test_settings_from_env() {
        clear_env();

        let settings = Settings::new().unwrap();
        assert_eq!(settings.port, 3000);
        assert_eq!(settings.title, "authdiag");
        assert_eq!(settings.backend_url, "http://localhost:8080");
        assert_eq!(settings.token_path, "/auth/token");
        assert_eq!(settings.identity_url, "https://graph.microsoft.com/v1.0/me");
        assert_eq!(settings.client_timeout, 30);
        assert_eq!(settings.render_wait_ms, 5000);
        assert_eq!(settings.extension(), Some("dev.l0w.ssh_public_keys"));
        assert_eq!(settings.max_sessions, 1000);
        assert_eq!(settings.session_idle(), Duration::from_secs(1800));
        assert_eq!(settings.proxy, ProxyConfig::default());

        std::env::set_var("AUTHDIAG_PORT", "7766");
        std::env::set_var("AUTHDIAG_BACKEND_URL", "http://backend:9000");
        std::env::set_var("AUTHDIAG_CLIENT_TIMEOUT", "3");
        std::env::set_var("AUTHDIAG_PROXY__ENABLED", "false");
        std::env::set_var("AUTHDIAG_PROXY__PREFIXES", "/auth");
        std::env::set_var("AUTHDIAG_EXTENSION_NAME", "");

        let settings = Settings::new().unwrap();
        assert_eq!(settings.port, 7766);
        assert_eq!(settings.backend_url, "http://backend:9000");
        assert_eq!(settings.client_timeout(), Duration::from_secs(3));
        assert!(!settings.proxy.enabled);
        assert_eq!(settings.proxy.get_prefixes(), vec!["/auth"]);
        assert!(settings.proxy.change_origin);
        assert_eq!(settings.extension(), None);

        clear_env();
    }

    #[test]
    fn test_get_backend_url() {
        let settings = Settings {
            backend_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.get_backend_url("/auth/token"),
            "http://localhost:8080/auth/token"
        );
        assert_eq!(
            settings.get_backend_url("api/x?y=1"),
            "http://localhost:8080/api/x?y=1"
        );
    }

    #[test]
    fn test_base_path() {
        let mut settings = Settings::default();
        assert_eq!(settings.base_path(), "");

        settings.public_url = "/diag/".to_string();
        assert_eq!(settings.base_path(), "/diag");

        settings.public_url = "https://example.com/tools/diag".to_string();
        assert_eq!(settings.base_path(), "/tools/diag");

        settings.public_url = "/".to_string();
        assert_eq!(settings.base_path(), "");
    }
}
