//! Open extension lookup: the user's SSH public keys stored as an open
//! extension on the identity record.

use crate::client::fetch_json;
use crate::error::FetchError;
use crate::identity::{Identity, IdentitySource};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// Extension holding the SSH public keys.
pub const DEFAULT_EXTENSION_NAME: &str = "dev.l0w.ssh_public_keys";

/// Reads one open extension of the signed-in user with the bearer token.
#[derive(Debug, Clone)]
pub struct ExtensionSource {
    client: Client,
    url: Url,
    extension_name: String,
}

impl ExtensionSource {
    /// Queries `identity_url` with `$select=id&$expand=extensions` and picks the
    /// extension whose id is `extension_name`.
    pub fn new(client: Client, identity_url: &Url, extension_name: impl Into<String>) -> Self {
        let mut url = identity_url.clone();
        url.set_query(Some("$select=id&$expand=extensions"));
        Self {
            client,
            url,
            extension_name: extension_name.into(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn extension_name(&self) -> &str {
        &self.extension_name
    }

    fn select(&self, user: &Value) -> Option<Value> {
        user.get("extensions")?
            .as_array()?
            .iter()
            .find(|extension| {
                extension.get("id").and_then(Value::as_str) == Some(self.extension_name.as_str())
            })
            .cloned()
    }
}

#[async_trait]
impl IdentitySource for ExtensionSource {
    async fn fetch(&self, access_token: &str) -> Result<Option<Identity>, FetchError> {
        let request = self.client.get(self.url.clone()).bearer_auth(access_token);
        let user = match fetch_json(request).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let extension = self.select(&user);
        if extension.is_none() {
            debug!("User has no {} extension", self.extension_name);
        }
        Ok(extension.map(Identity::new))
    }
}
