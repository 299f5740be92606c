//! Authentication for the catalog API
//!
//! Token model, token-endpoint exchanges (authorization code with optional
//! PKCE, refresh token, client credentials) and the single-flight refresh gate
//! that every request goes through.

pub mod oauth;
pub mod refresh;
pub mod tokens;

use serde::{Deserialize, Serialize};

pub use oauth::AuthorizationRequest;
pub use refresh::{RefreshListener, Refresher};
pub use tokens::{GrantKind, Token, TokenResponse};

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Application credentials. Fixed once the client is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth2 client ID
    pub client_id: String,
    /// Client secret; absent for public (PKCE) clients
    pub client_secret: Option<String>,
    /// Redirect URI registered for the authorization-code flow
    pub redirect_uri: Option<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }
}

/// Authorization server endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
        }
    }
}
