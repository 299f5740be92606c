//! Bearer token model and the token endpoint's wire shape

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How the client obtained its token; decides the built-in refresh strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// User authorization (code or PKCE). Refreshed with the refresh token.
    #[default]
    AuthorizationCode,
    /// App-only access. Re-obtained with the client-credentials grant.
    ClientCredentials,
}

/// Access token with its expiry bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    /// Lifetime in seconds, counted from `issued_at`.
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub scopes: Option<BTreeSet<String>>,
}

impl Token {
    /// Bearer token issued now.
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "Bearer".to_string(),
            issued_at: Utc::now(),
            expires_in,
            refresh_token: None,
            scopes: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Absolute expiry instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let lifetime = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        Duration::try_seconds(lifetime)
            .and_then(|d| self.issued_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.as_ref().is_some_and(|s| s.contains(scope))
    }
}

/// JSON body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    /// Space-separated scope list.
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a [`Token`] issued now. A response without a refresh token
    /// keeps `previous_refresh` so rotation-less providers stay refreshable.
    pub fn into_token(self, previous_refresh: Option<String>) -> Token {
        let scopes = self
            .scope
            .map(|s| s.split_whitespace().map(str::to_string).collect::<BTreeSet<_>>())
            .filter(|s| !s.is_empty());

        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            issued_at: Utc::now(),
            expires_in: self.expires_in,
            refresh_token: self.refresh_token.or(previous_refresh),
            scopes,
        }
    }
}
