mod common;

use std::time::{Duration, Instant};

use catalog_client::api::ApiRequest;
use catalog_client::{ClientOptions, Error};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, fast_options};

#[tokio::test]
async fn test_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "me"})))
        .expect(1)
        .mount(&server)
        .await;

    let me: Value = client(&server, fast_options())
        .execute(ApiRequest::get("/v1/me"))
        .await
        .unwrap();
    assert_eq!(me["id"], "me");
}

#[tokio::test]
async fn test_cached_get_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let first: Value = client.execute(ApiRequest::get("/v1/tracks/a")).await.unwrap();
    let second: Value = client.execute(ApiRequest::get("/v1/tracks/a")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_cache_limit_evicts_oldest() {
    let server = MockServer::start().await;
    for (id, times) in [("a", 2u64), ("b", 1), ("c", 1)] {
        Mock::given(method("GET"))
            .and(path(format!("/v1/tracks/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id })))
            .expect(times)
            .mount(&server)
            .await;
    }

    let client = client(
        &server,
        ClientOptions {
            cache_limit: Some(2),
            ..fast_options()
        },
    );
    for id in ["a", "b", "c"] {
        let _: Value = client
            .execute(ApiRequest::get(format!("/v1/tracks/{id}")))
            .await
            .unwrap();
    }
    assert_eq!(client.cache_len(), 2);

    // B and C are served from cache, A was evicted and goes out again
    for id in ["b", "c", "a"] {
        let _: Value = client
            .execute(ApiRequest::get(format!("/v1/tracks/{id}")))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_disabled_cache_always_sends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            use_cache: false,
            ..fast_options()
        },
    );
    for _ in 0..2 {
        let _: Value = client.execute(ApiRequest::get("/v1/tracks/a")).await.unwrap();
    }
    assert_eq!(client.cache_len(), 0);
}

#[tokio::test]
async fn test_write_invalidates_cached_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/tracks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let _: Value = client.execute(ApiRequest::get("/v1/me/tracks")).await.unwrap();
    client
        .execute::<()>(ApiRequest::put("/v1/me/tracks").query("ids", "x"))
        .await
        .unwrap();
    let _: Value = client.execute(ApiRequest::get("/v1/me/tracks")).await.unwrap();
}

#[tokio::test]
async fn test_server_errors_retried_up_to_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/x"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            retry_on_internal_server_error_times: Some(3),
            ..fast_options()
        },
    );
    let album: Value = client.execute(ApiRequest::get("/v1/albums/x")).await.unwrap();
    assert_eq!(album["id"], "x");
}

#[tokio::test]
async fn test_unbounded_server_retries_keep_going() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/x"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(8)
        .expect(8)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            retry_on_internal_server_error_times: None,
            ..fast_options()
        },
    );
    let album: Value = client.execute(ApiRequest::get("/v1/albums/x")).await.unwrap();

    assert_eq!(album["id"], "x");
    assert_eq!(server.received_requests().await.unwrap().len(), 9);
}

#[tokio::test]
async fn test_undecodable_body_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "a"})))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let err = client
        .execute::<u32>(ApiRequest::get("/v1/tracks/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    assert_eq!(client.cache_len(), 0);

    // the failed decode left nothing behind, so this goes to the network
    let track: Value = client.execute(ApiRequest::get("/v1/tracks/a")).await.unwrap();
    assert_eq!(track["id"], "a");
    assert_eq!(client.cache_len(), 1);
}

#[tokio::test]
async fn test_server_errors_past_limit_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/x"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            retry_on_internal_server_error_times: Some(2),
            ..fast_options()
        },
    );
    let err = client
        .execute::<Value>(ApiRequest::get("/v1/albums/x"))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        Error::UpstreamUnavailable {
            status: 502,
            retries: 2,
            message: "bad gateway".into(),
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_zero_server_retries_fails_on_first_5xx() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            retry_on_internal_server_error_times: Some(0),
            ..fast_options()
        },
    );
    let err = client
        .execute::<Value>(ApiRequest::get("/v1/albums/x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamUnavailable { retries: 0, .. }));
}

#[tokio::test]
async fn test_rate_limit_without_retry_fails_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            retry_when_rate_limited: false,
            ..fast_options()
        },
    );
    let err = client
        .execute::<Value>(ApiRequest::get("/v1/tracks/a"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::RateLimited {
            retry_after: Duration::from_secs(7)
        }
    );
}

#[tokio::test]
async fn test_rate_limit_waits_retry_after_then_resends() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let started = Instant::now();
    let body: Value = client.execute(ApiRequest::get("/v1/tracks/a")).await.unwrap();

    assert_eq!(body["ok"], true);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_client_error_is_bad_request_with_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            json!({"error": {"status": 400, "message": "invalid id"}}),
        ))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, fast_options())
        .execute::<Value>(ApiRequest::get("/v1/tracks/bad-id"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::BadRequest {
            status: 400,
            message: "invalid id".into(),
        }
    );
}

#[tokio::test]
async fn test_optional_lookup_maps_not_found_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let missing: Option<Value> = client
        .execute_optional(ApiRequest::get("/v1/tracks/missing"))
        .await
        .unwrap();
    assert!(missing.is_none());

    let err = client
        .execute_optional::<Value>(ApiRequest::get("/v1/tracks/forbidden"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = client(
        &server,
        ClientOptions {
            request_timeout_millis: Some(50),
            ..fast_options()
        },
    );
    let err = client
        .execute::<Value>(ApiRequest::get("/v1/tracks/slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport { timed_out: true, .. }));
}

#[tokio::test]
async fn test_no_content_decodes_as_unit() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client(&server, fast_options())
        .execute::<()>(ApiRequest::delete("/v1/me/following").query("ids", "a"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_malformed_body_is_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server, fast_options())
        .execute::<Value>(ApiRequest::get("/v1/tracks/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}
