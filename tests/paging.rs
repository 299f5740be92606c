mod common;

use catalog_client::api::{albums, artists};
use catalog_client::Error;
use futures::TryStreamExt;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, fast_options, track_json};

const TOTAL: u32 = 5;

fn tracks_link(server: &MockServer, offset: u32) -> String {
    format!("{}/v1/albums/x/tracks?offset={offset}&limit=2", server.uri())
}

fn album_page(server: &MockServer, offset: u32) -> Value {
    let items: Vec<Value> = (offset..(offset + 2).min(TOTAL))
        .map(|i| track_json(&format!("t{i}")))
        .collect();
    let next = (offset + 2 < TOTAL).then(|| tracks_link(server, offset + 2));
    let previous = (offset > 0).then(|| tracks_link(server, offset - 2));
    json!({
        "href": tracks_link(server, offset),
        "items": items,
        "limit": 2,
        "next": next,
        "offset": offset,
        "previous": previous,
        "total": TOTAL,
    })
}

async fn mount_album(server: &MockServer, expect: Option<u64>) {
    for offset in [0, 2, 4] {
        let mock = Mock::given(method("GET"))
            .and(path("/v1/albums/x/tracks"))
            .and(query_param("offset", offset.to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(album_page(server, offset)));
        match expect {
            Some(times) => mock.expect(times).mount(server).await,
            None => mock.mount(server).await,
        }
    }
}

fn ids(items: &[catalog_client::models::SimpleTrack]) -> Vec<String> {
    items.iter().filter_map(|t| t.id.clone()).collect()
}

#[tokio::test]
async fn test_all_items_from_middle_page() {
    let server = MockServer::start().await;
    mount_album(&server, Some(1)).await;
    let client = client(&server, fast_options());

    let middle = albums::album_tracks(&client, "x", Some(2), Some(2))
        .await
        .unwrap();
    assert!(middle.has_previous());
    assert!(middle.has_next());

    let items = middle.all_items().await.unwrap();
    assert_eq!(ids(&items), ["t0", "t1", "t2", "t3", "t4"]);
}

#[tokio::test]
async fn test_next_then_previous_returns_to_page() {
    let server = MockServer::start().await;
    mount_album(&server, None).await;
    let client = client(&server, fast_options());

    let first = albums::album_tracks(&client, "x", Some(2), None).await.unwrap();
    assert!(!first.has_previous());
    assert!(first.previous().await.unwrap().is_none());

    let second = first.next().await.unwrap().unwrap();
    assert_eq!(ids(second.items()), ["t2", "t3"]);

    let back = second.previous().await.unwrap().unwrap();
    assert_eq!(back.items(), first.items());
    // the original handle is untouched
    assert_eq!(ids(first.items()), ["t0", "t1"]);
}

#[tokio::test]
async fn test_take_pages_and_streams() {
    let server = MockServer::start().await;
    mount_album(&server, None).await;
    let client = client(&server, fast_options());

    let first = albums::album_tracks(&client, "x", Some(2), None).await.unwrap();
    assert_eq!(first.take_pages(2).await.unwrap().len(), 2);
    assert_eq!(first.take_pages(10).await.unwrap().len(), 3);

    let forward: Vec<_> = first.pages_forward().try_collect().await.unwrap();
    assert_eq!(forward.len(), 3);

    let last = forward.last().unwrap();
    assert!(!last.has_next());
    let backward: Vec<_> = last.pages_backward().try_collect().await.unwrap();
    let firsts: Vec<_> = backward
        .iter()
        .map(|p| p.items()[0].id.clone().unwrap())
        .collect();
    assert_eq!(firsts, ["t4", "t2", "t0"]);
}

#[tokio::test]
async fn test_oversized_page_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/y/tracks"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": "h", "items": [track_json("a"), track_json("b")], "limit": 1,
            "next": null, "offset": 1, "previous": null, "total": 3,
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/albums/y/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "href": "h", "items": [track_json("a")], "limit": 1,
            "next": format!("{}/v1/albums/y/tracks?offset=1&limit=1", server.uri()),
            "offset": 0, "previous": null, "total": 3,
        })))
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let first = albums::album_tracks(&client, "y", Some(1), None).await.unwrap();
    let err = first.next().await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    // only the first page stays cached
    assert_eq!(client.cache_len(), 1);
}

fn artist_json(id: &str) -> Value {
    json!({ "id": id, "name": format!("Artist {id}"), "uri": format!("spotify:artist:{id}") })
}

#[tokio::test]
async fn test_followed_artists_cursor_pages() {
    let server = MockServer::start().await;
    // more specific mock first: it must win for the second page
    Mock::given(method("GET"))
        .and(path("/v1/me/following"))
        .and(query_param("after", "a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": {
                "href": "h2", "items": [artist_json("a2")], "limit": 1,
                "next": null, "cursors": { "after": null }, "total": 2,
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me/following"))
        .and(query_param("type", "artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "artists": {
                "href": "h1", "items": [artist_json("a1")], "limit": 1,
                "next": format!("{}/v1/me/following?type=artist&after=a1&limit=1", server.uri()),
                "cursors": { "after": "a1" }, "total": 2,
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, fast_options());
    let first = artists::followed_artists(&client, Some(1), None).await.unwrap();

    let all: Vec<_> = first
        .all_items()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(all, ["a1", "a2"]);

    let err = first.previous().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
    let res: Result<Vec<_>, _> = first.pages_backward().try_collect().await;
    assert!(matches!(res, Err(Error::UnsupportedOperation(_))));
}
