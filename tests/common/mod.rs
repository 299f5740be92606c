#![allow(dead_code)]

use catalog_client::auth::AuthEndpoints;
use catalog_client::{CatalogClient, CatalogClientBuilder, ClientOptions, Credentials, Token};
use wiremock::MockServer;

/// Options with no backoff so 5xx tests don't sleep.
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        server_error_backoff_millis: 0,
        ..ClientOptions::default()
    }
}

pub fn endpoints(server: &MockServer) -> AuthEndpoints {
    AuthEndpoints {
        authorize_url: format!("{}/authorize", server.uri()),
        token_url: format!("{}/api/token", server.uri()),
    }
}

/// Builder pointed at the mock server for both API and token endpoint.
pub fn builder(server: &MockServer, credentials: Credentials) -> CatalogClientBuilder {
    CatalogClient::builder(credentials)
        .api_base(server.uri())
        .endpoints(endpoints(server))
}

/// Client holding a valid token `"tok"`.
pub fn client(server: &MockServer, options: ClientOptions) -> CatalogClient {
    builder(server, Credentials::new("client-1"))
        .options(options)
        .token(Token::new("tok", 3600))
        .build()
        .unwrap()
}

pub fn token_json(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = refresh.into();
    }
    body
}

pub fn track_json(id: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "track",
        "id": id,
        "name": format!("Track {id}"),
        "uri": format!("spotify:track:{id}"),
        "duration_ms": 180000,
        "artists": [{ "id": "ar1", "name": "Artist", "uri": "spotify:artist:ar1" }],
    })
}
