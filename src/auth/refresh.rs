//! Token state and single-flight refresh
//!
//! The [`TokenGate`] is the only holder of the client's bearer token. When a
//! request finds the token expired it joins the refresh already in flight, or
//! starts one if none is. The refresh runs on its own task, so a caller that is
//! cancelled while waiting neither aborts it nor leaves the gate occupied.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};

use super::{GrantKind, Token};
use crate::api::client::CatalogClient;
use crate::error::{Error, Result};

/// Produces a new token. Takes precedence over the built-in refresh-token
/// and client-credentials exchanges.
///
/// Runs inside the refresh gate: it must not send API requests through the
/// same client, since those would wait on the refresh they are part of.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self, client: &CatalogClient) -> Result<Token>;
}

/// Notified after every successful refresh, before waiting callers resume.
#[async_trait]
pub trait RefreshListener: Send + Sync {
    async fn on_refresh(&self, client: &CatalogClient, token: &Token);
}

#[async_trait]
impl<F> RefreshListener for F
where
    F: Fn(&CatalogClient, &Token) + Send + Sync,
{
    async fn on_refresh(&self, client: &CatalogClient, token: &Token) {
        self(client, token);
    }
}

type InFlight = Shared<BoxFuture<'static, Result<Token>>>;

/// One refresh, tagged so a finishing task only clears its own slot.
struct Flight {
    id: u64,
    outcome: InFlight,
}

pub(crate) struct TokenGate {
    token: RwLock<Option<Token>>,
    in_flight: Mutex<Option<Flight>>,
    next_flight: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TokenGate {
    pub fn new(token: Option<Token>) -> Self {
        Self {
            token: RwLock::new(token),
            in_flight: Mutex::new(None),
            next_flight: AtomicU64::new(0),
        }
    }

    pub fn current(&self) -> Option<Token> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn publish(&self, token: Option<Token>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    fn fresh(&self) -> Option<Token> {
        self.current().filter(|t| !t.is_expired())
    }

    /// Current token if still valid, otherwise the outcome of a (shared)
    /// refresh.
    pub async fn refresh_if_needed(&self, client: &CatalogClient) -> Result<Token> {
        if let Some(token) = self.fresh() {
            return Ok(token);
        }
        if !client.options().automatic_refresh {
            return Err(Error::Authentication(
                "access token expired and automatic refresh is disabled".into(),
            ));
        }
        self.join(client, false).await
    }

    /// Refresh regardless of expiry, still sharing any refresh in flight.
    pub async fn force_refresh(&self, client: &CatalogClient) -> Result<Token> {
        self.join(client, true).await
    }

    async fn join(&self, client: &CatalogClient, force: bool) -> Result<Token> {
        let outcome = {
            let mut slot = lock(&self.in_flight);
            match slot.as_ref() {
                // a resolved flight is left over from a task that never
                // reached `finish`; it must not be joined
                Some(flight) if flight.outcome.peek().is_none() => {
                    tracing::debug!("Joining token refresh already in flight");
                    flight.outcome.clone()
                }
                _ => {
                    // A refresh may have published between our expiry check
                    // and taking the slot.
                    if !force {
                        if let Some(token) = self.fresh() {
                            return Ok(token);
                        }
                    }
                    let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
                    let outcome = spawn_refresh(client.clone(), id);
                    *slot = Some(Flight {
                        id,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };
        outcome.await
    }

    fn finish(&self, id: u64) {
        let mut slot = lock(&self.in_flight);
        if slot.as_ref().is_some_and(|f| f.id == id) {
            *slot = None;
        }
    }
}

fn spawn_refresh(client: CatalogClient, id: u64) -> InFlight {
    let task = tokio::spawn(async move {
        tracing::info!("Refreshing access token...");

        let run = async {
            let token = run_strategy(&client).await?;
            client.gate().publish(Some(token.clone()));
            if let Some(listener) = client.refresh_listener() {
                listener.on_refresh(&client, &token).await;
            }
            Ok::<_, Error>(token)
        };
        let outcome = AssertUnwindSafe(run)
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::Authentication("token refresh panicked".into())));

        match &outcome {
            Ok(_) => tracing::info!("Access token refreshed"),
            Err(e) => tracing::warn!("Token refresh failed: {}", e),
        }

        client.gate().finish(id);
        outcome
    });

    // An aborted task never reaches `finish`; `join` replaces its resolved
    // flight instead.
    task.map(|joined| {
        joined.unwrap_or_else(|e| {
            Err(Error::Authentication(format!(
                "token refresh task did not complete: {e}"
            )))
        })
    })
    .boxed()
    .shared()
}

/// Custom refresher, then refresh-token exchange, then (app-only clients)
/// client credentials.
async fn run_strategy(client: &CatalogClient) -> Result<Token> {
    if let Some(refresher) = client.refresher() {
        tracing::debug!("Using custom token refresher");
        return refresher.refresh(client).await;
    }

    let endpoint = client.token_endpoint();
    let current = client.gate().current();
    if let Some(refresh_token) = current.as_ref().and_then(|t| t.refresh_token.as_deref()) {
        return endpoint.refresh(refresh_token).await;
    }
    if client.grant() == GrantKind::ClientCredentials {
        return endpoint.client_credentials().await;
    }

    Err(Error::Authentication(
        "no valid access token and no way to refresh it; authorize first".into(),
    ))
}
