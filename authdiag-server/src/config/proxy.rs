use serde::Deserialize;

/// Configuration for the development proxy forwarder
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Forward matching requests to the backend (default: true)
    pub enabled: bool,

    /// Comma-separated path prefixes to forward (default: "/auth,/api")
    pub prefixes: String,

    /// Rewrite the Origin header to the backend origin (default: true)
    pub change_origin: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefixes: "/auth,/api".to_string(),
            change_origin: true,
        }
    }
}

impl ProxyConfig {
    /// Get the forwarded prefixes, normalized to `/segment` form without
    /// duplicates. A bare `/` and the service's own `/_authdiag` are dropped.
    pub fn get_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::new();
        for prefix in self.prefixes.split(',') {
            let prefix = prefix.trim().trim_matches('/');
            if prefix.is_empty() || prefix.split('/').next() == Some("_authdiag") {
                continue;
            }
            let prefix = format!("/{}", prefix);
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }
        prefixes
    }
}
