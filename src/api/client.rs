//! Authenticated HTTP client for the catalog API
//!
//! Every endpoint call funnels through [`CatalogClient::execute`]: token
//! check, cache lookup, send, then rate-limit and server-error handling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

use super::cache::{CacheKey, ResponseCache};
use super::request::{ApiRequest, Body};
use crate::auth::oauth::{self, TokenEndpoint};
use crate::auth::refresh::TokenGate;
use crate::auth::{
    AuthEndpoints, AuthorizationRequest, Credentials, GrantKind, RefreshListener, Refresher, Token,
};
use crate::config::ClientOptions;
use crate::error::{Error, Result};

const API_BASE: &str = "https://api.spotify.com";

/// Wait used when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Cheap to clone; clones share token state and cache.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    api_base: Url,
    credentials: Credentials,
    endpoints: AuthEndpoints,
    grant: GrantKind,
    options: ClientOptions,
    gate: TokenGate,
    cache: ResponseCache,
    refresher: Option<Arc<dyn Refresher>>,
    listener: Option<Arc<dyn RefreshListener>>,
}

struct RawResponse {
    status: StatusCode,
    retry_after: Duration,
    body: String,
}

impl CatalogClient {
    pub fn builder(credentials: Credentials) -> CatalogClientBuilder {
        CatalogClientBuilder::new(credentials)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub fn credentials(&self) -> &Credentials {
        &self.inner.credentials
    }

    pub fn api_base(&self) -> &Url {
        &self.inner.api_base
    }

    /// Current token, valid or not.
    pub fn token(&self) -> Option<Token> {
        self.inner.gate.current()
    }

    /// Replace the token, e.g. after an out-of-band login.
    pub fn set_token(&self, token: Token) {
        self.inner.gate.publish(Some(token));
    }

    pub fn clear_token(&self) {
        self.inner.gate.publish(None);
    }

    /// Current token if unexpired, otherwise a refreshed one. Concurrent
    /// callers share a single refresh.
    pub async fn refresh_if_needed(&self) -> Result<Token> {
        self.inner.gate.refresh_if_needed(self).await
    }

    /// Refresh now, regardless of expiry.
    pub async fn refresh_token(&self) -> Result<Token> {
        self.inner.gate.force_refresh(self).await
    }

    /// Authorization URL for the user-consent step of the code flow.
    pub fn authorization_url(&self, scopes: &[&str], pkce: bool) -> Result<AuthorizationRequest> {
        oauth::authorization_url(&self.inner.credentials, &self.inner.endpoints, scopes, pkce)
    }

    /// Exchange an authorization code and install the resulting token.
    pub async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> Result<Token> {
        let token = self.token_endpoint().exchange_code(code, code_verifier).await?;
        self.set_token(token.clone());
        Ok(token)
    }

    /// Obtain an app-only token with the client-credentials grant.
    pub async fn request_app_token(&self) -> Result<Token> {
        let token = self.token_endpoint().client_credentials().await?;
        self.set_token(token.clone());
        Ok(token)
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Send a request and deserialize the body into `T`. Empty bodies
    /// (204) decode as JSON `null`.
    pub async fn execute<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.send(&request).await?;
        decode(&body).inspect_err(|_| self.forget(&request))
    }

    /// Like [`execute`](Self::execute), but a 400/404 means "no such entity"
    /// and yields `None`.
    pub async fn execute_optional<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Option<T>> {
        match self.send(&request).await {
            Ok(body) => decode(&body).inspect_err(|_| self.forget(&request)),
            Err(Error::BadRequest {
                status: 400 | 404,
                ..
            }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Run one logical request to completion and return the raw body.
    pub async fn send(&self, request: &ApiRequest) -> Result<String> {
        let mut token = self.refresh_if_needed().await?;

        let url = self.resolve(request)?;
        let key = CacheKey::new(&request.method, &url, request.body.as_ref());
        let cacheable = request.is_cacheable();

        if cacheable {
            if let Some(body) = self.inner.cache.get(&key) {
                tracing::debug!("Cache hit {} {}", request.method, url);
                return Ok(body);
            }
        }

        let options = &self.inner.options;
        let mut server_retries: u32 = 0;

        loop {
            let resp = self.send_once(request, &url, &token.access_token).await?;
            let status = resp.status;

            if status.is_success() {
                if cacheable {
                    self.inner.cache.put(key, resp.body.clone());
                } else if request.is_mutating() {
                    let dropped = self.inner.cache.invalidate_resource(url.path());
                    if dropped > 0 {
                        tracing::debug!("Invalidated {} cached responses for {}", dropped, url.path());
                    }
                }
                return Ok(resp.body);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !options.retry_when_rate_limited {
                    return Err(Error::RateLimited {
                        retry_after: resp.retry_after,
                    });
                }
                tracing::warn!(
                    "Rate limited on {}, retrying in {}s",
                    url,
                    resp.retry_after.as_secs()
                );
                tokio::time::sleep(resp.retry_after).await;
            } else if status.is_server_error() {
                if let Some(limit) = options.retry_on_internal_server_error_times {
                    if server_retries >= limit {
                        return Err(Error::UpstreamUnavailable {
                            status: status.as_u16(),
                            retries: server_retries,
                            message: error_message(status, &resp.body),
                        });
                    }
                }
                server_retries += 1;
                tracing::warn!(
                    "HTTP {} for {}, retry {}",
                    status.as_u16(),
                    url,
                    server_retries
                );
                let delay = options.server_error_backoff(server_retries);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            } else {
                return Err(Error::BadRequest {
                    status: status.as_u16(),
                    message: error_message(status, &resp.body),
                });
            }

            // a long wait may have outlived the token
            token = self.refresh_if_needed().await?;
        }
    }

    /// Drop the cached response of `request`, e.g. after its body failed to
    /// decode.
    pub(crate) fn forget(&self, request: &ApiRequest) {
        if !request.is_cacheable() {
            return;
        }
        if let Ok(url) = self.resolve(request) {
            let key = CacheKey::new(&request.method, &url, request.body.as_ref());
            if self.inner.cache.invalidate(&key) {
                tracing::debug!("Dropped undecodable cached response for {}", url);
            }
        }
    }

    fn resolve(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.inner.api_base.join(&request.target)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    async fn send_once(&self, request: &ApiRequest, url: &Url, bearer: &str) -> Result<RawResponse> {
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url.clone())
            .bearer_auth(bearer);
        builder = match &request.body {
            Some(Body::Json(json)) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(json.clone()),
            Some(Body::Form(pairs)) => builder.form(pairs),
            // bodiless writes still need Content-Length: 0
            None if request.is_mutating() => builder.body(""),
            None => builder,
        };

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status();
            let retry_after = parse_retry_after(resp.headers());
            let body = resp.text().await?;
            Ok::<_, Error>(RawResponse {
                status,
                retry_after,
                body,
            })
        };

        match self.inner.options.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, exchange)
                .await
                .map_err(|_| Error::Transport {
                    message: format!(
                        "{} {} timed out after {}ms",
                        request.method,
                        url,
                        limit.as_millis()
                    ),
                    timed_out: true,
                })?,
            None => exchange.await,
        }
    }

    pub(crate) fn gate(&self) -> &TokenGate {
        &self.inner.gate
    }

    pub(crate) fn grant(&self) -> GrantKind {
        self.inner.grant
    }

    pub(crate) fn refresher(&self) -> Option<&Arc<dyn Refresher>> {
        self.inner.refresher.as_ref()
    }

    pub(crate) fn refresh_listener(&self) -> Option<&Arc<dyn RefreshListener>> {
        self.inner.listener.as_ref()
    }

    pub(crate) fn token_endpoint(&self) -> TokenEndpoint<'_> {
        TokenEndpoint {
            http: &self.inner.http,
            token_url: &self.inner.endpoints.token_url,
            credentials: &self.inner.credentials,
            timeout: self.inner.options.request_timeout(),
        }
    }
}

impl fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogClient")
            .field("api_base", &self.inner.api_base.as_str())
            .field("client_id", &self.inner.credentials.client_id)
            .field("grant", &self.inner.grant)
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let text = if body.trim().is_empty() { "null" } else { body };
    Ok(serde_json::from_str(text)?)
}

/// `Retry-After` in whole seconds.
fn parse_retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}

/// Pull the message out of `{"error":{"status":..,"message":..}}` or
/// `{"error":..,"error_description":..}`, falling back to the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    let error = &value["error"];
    error["message"]
        .as_str()
        .or_else(|| value["error_description"].as_str())
        .or_else(|| error.as_str())
        .map_or_else(|| body.to_string(), str::to_string)
}

/// Builder for [`CatalogClient`].
pub struct CatalogClientBuilder {
    credentials: Credentials,
    options: ClientOptions,
    token: Option<Token>,
    grant: GrantKind,
    api_base: String,
    endpoints: AuthEndpoints,
    refresher: Option<Arc<dyn Refresher>>,
    listener: Option<Arc<dyn RefreshListener>>,
    http: Option<reqwest::Client>,
}

impl CatalogClientBuilder {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            options: ClientOptions::default(),
            token: None,
            grant: GrantKind::default(),
            api_base: API_BASE.to_string(),
            endpoints: AuthEndpoints::default(),
            refresher: None,
            listener: None,
            http: None,
        }
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn token(mut self, token: Token) -> Self {
        self.token = Some(token);
        self
    }

    pub fn maybe_token(mut self, token: Option<Token>) -> Self {
        self.token = token;
        self
    }

    pub fn grant(mut self, grant: GrantKind) -> Self {
        self.grant = grant;
        self
    }

    /// App-only client: tokens come from the client-credentials grant.
    pub fn client_credentials(self) -> Self {
        self.grant(GrantKind::ClientCredentials)
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn refresher(mut self, refresher: impl Refresher + 'static) -> Self {
        self.refresher = Some(Arc::new(refresher));
        self
    }

    pub fn on_refresh(mut self, listener: impl RefreshListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<CatalogClient> {
        let api_base = Url::parse(&self.api_base)?;
        let cache = ResponseCache::new(self.options.use_cache, self.options.cache_limit);

        Ok(CatalogClient {
            inner: Arc::new(Inner {
                http: self.http.unwrap_or_default(),
                api_base,
                credentials: self.credentials,
                endpoints: self.endpoints,
                grant: self.grant,
                options: self.options,
                gate: TokenGate::new(self.token),
                cache,
                refresher: self.refresher,
                listener: self.listener,
            }),
        })
    }
}
