//! # authdiag
//!
//! Building blocks of the authentication diagnostic page.
//!
//! ## Components
//!
//! - **Token store:** holds the token fetched from the backend's `/auth/token`
//!   endpoint and sequences overlapping refreshes.
//! - **Identity subscription:** follows the token store and fetches the identity
//!   record for each distinct access token.
//! - **Extension lookup:** the SSH public keys stored as an open extension on
//!   the identity record, followed the same way.
//! - **Sessions:** one token store and set of subscriptions per browser.
//! - **Views:** HTML renderers for the navigation, token and identity panels and
//!   the page layout.

pub mod client;
pub mod error;
pub mod extension;
pub mod identity;
pub mod render;
pub mod session;
pub mod token;

pub use client::build_client;
pub use error::FetchError;
pub use extension::{DEFAULT_EXTENSION_NAME, ExtensionSource};
pub use identity::{
    BearerIdentitySource, DEFAULT_IDENTITY_URL, Identity, IdentitySource, IdentityState,
    IdentityView,
};
pub use session::{Session, SessionSources, Sessions};
pub use token::{Credentials, HttpTokenSource, Token, TokenSource, TokenState, TokenStore};
