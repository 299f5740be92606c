//! Token endpoint exchanges
//!
//! The wire format is fixed by the authorization server: form-encoded POST
//! bodies keyed by `grant_type`, JSON [`TokenResponse`] back. Confidential
//! clients authenticate with HTTP basic auth; public (PKCE) clients send
//! `client_id` in the form instead.

use std::time::Duration;

use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, Scope, TokenUrl,
};

use super::{AuthEndpoints, Credentials, Token, TokenResponse};
use crate::error::{Error, Result};

/// Authorization URL plus the state the caller must keep until the redirect
/// comes back.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: url::Url,
    /// CSRF `state` parameter embedded in `url`
    pub state: String,
    /// PKCE verifier to pass to the code exchange, if PKCE was requested
    pub code_verifier: Option<String>,
}

/// Build the user-facing authorization URL.
pub fn authorization_url(
    credentials: &Credentials,
    endpoints: &AuthEndpoints,
    scopes: &[&str],
    pkce: bool,
) -> Result<AuthorizationRequest> {
    let redirect = credentials
        .redirect_uri
        .as_deref()
        .ok_or_else(|| Error::usage("authorization flow requires a redirect URI"))?;

    let client = BasicClient::new(
        ClientId::new(credentials.client_id.clone()),
        credentials.client_secret.clone().map(ClientSecret::new),
        AuthUrl::new(endpoints.authorize_url.clone())?,
        Some(TokenUrl::new(endpoints.token_url.clone())?),
    )
    .set_redirect_uri(RedirectUrl::new(redirect.to_string())?);

    let mut request = client
        .authorize_url(CsrfToken::new_random)
        .add_scopes(scopes.iter().map(|s| Scope::new((*s).to_string())));

    let mut code_verifier = None;
    if pkce {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        request = request.set_pkce_challenge(challenge);
        code_verifier = Some(verifier.secret().to_string());
    }

    let (url, state) = request.url();
    Ok(AuthorizationRequest {
        url,
        state: state.secret().to_string(),
        code_verifier,
    })
}

/// POSTs grant forms to the token URL.
pub(crate) struct TokenEndpoint<'a> {
    pub http: &'a reqwest::Client,
    pub token_url: &'a str,
    pub credentials: &'a Credentials,
    pub timeout: Option<Duration>,
}

impl TokenEndpoint<'_> {
    /// `grant_type=authorization_code`. With a verifier the client
    /// identifies itself in the form (PKCE).
    pub async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Token> {
        let redirect = self
            .credentials
            .redirect_uri
            .as_deref()
            .ok_or_else(|| Error::usage("code exchange requires a redirect URI"))?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("client_id", self.credentials.client_id.as_str()));
            form.push(("code_verifier", verifier));
        }

        self.post(&form, None).await
    }

    /// `grant_type=refresh_token`. Keeps `refresh_token` when the server does
    /// not rotate it.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        if self.credentials.client_secret.is_none() {
            form.push(("client_id", self.credentials.client_id.as_str()));
        }

        self.post(&form, Some(refresh_token.to_string())).await
    }

    /// `grant_type=client_credentials`; needs a client secret.
    pub async fn client_credentials(&self) -> Result<Token> {
        if self.credentials.client_secret.is_none() {
            return Err(Error::Authentication(
                "client credentials grant requires a client secret".into(),
            ));
        }
        self.post(&[("grant_type", "client_credentials")], None).await
    }

    async fn post(&self, form: &[(&str, &str)], previous_refresh: Option<String>) -> Result<Token> {
        let grant = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map_or("?", |(_, v)| *v);
        tracing::debug!("Token request grant_type={} to {}", grant, self.token_url);

        let mut request = self.http.post(self.token_url).form(form);
        if let Some(secret) = &self.credentials.client_secret {
            request = request.basic_auth(&self.credentials.client_id, Some(secret));
        }

        let send = async {
            let resp = request.send().await?;
            let status = resp.status();
            let body = resp.text().await?;
            Ok::<_, Error>((status, body))
        };
        let (status, body) = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| Error::Transport {
                    message: format!("token request timed out after {}ms", limit.as_millis()),
                    timed_out: true,
                })??,
            None => send.await?,
        };

        if status.is_server_error() {
            return Err(Error::UpstreamUnavailable {
                status: status.as_u16(),
                retries: 0,
                message: body,
            });
        }
        if !status.is_success() {
            return Err(Error::Authentication(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body)?;
        Ok(response.into_token(previous_refresh))
    }
}
