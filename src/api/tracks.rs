//! Track endpoints

use serde::Deserialize;

use super::client::CatalogClient;
use super::paging::{Page, PageHandle};
use super::request::ApiRequest;
use crate::error::Result;
use crate::models::{SavedTrack, Track};

/// Ids accepted per call by the multi-track endpoints.
pub const MAX_TRACK_IDS: usize = 50;

#[derive(Debug, Deserialize)]
struct TracksResponse {
    tracks: Vec<Option<Track>>,
}

/// Single track, `None` if the id is unknown.
pub async fn get_track(
    client: &CatalogClient,
    id: &str,
    market: Option<&str>,
) -> Result<Option<Track>> {
    let request = ApiRequest::get(format!("/v1/tracks/{id}")).query_opt("market", market);
    client.execute_optional(request).await
}

/// Several tracks in input order; unknown ids yield `None` at their position.
pub async fn get_tracks(
    client: &CatalogClient,
    ids: &[&str],
    market: Option<&str>,
) -> Result<Vec<Option<Track>>> {
    client
        .execute_bulk(ids, MAX_TRACK_IDS, |chunk| async move {
            let request = ApiRequest::get("/v1/tracks")
                .query("ids", chunk.join(","))
                .query_opt("market", market);
            let resp: TracksResponse = client.execute(request).await?;
            Ok(resp.tracks)
        })
        .await
}

/// First page of the user's saved tracks.
pub async fn saved_tracks(
    client: &CatalogClient,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<PageHandle<SavedTrack>> {
    let request = ApiRequest::get("/v1/me/tracks")
        .query("limit", limit.unwrap_or(client.options().default_page_limit))
        .query_opt("offset", offset);
    let page: Page<SavedTrack> = client.execute(request).await?;
    Ok(client.page(page))
}

pub async fn save_tracks(client: &CatalogClient, ids: &[&str]) -> Result<()> {
    client
        .execute_bulk(ids, MAX_TRACK_IDS, |chunk| async move {
            client
                .execute::<()>(ApiRequest::put("/v1/me/tracks").query("ids", chunk.join(",")))
                .await?;
            Ok(Vec::<()>::new())
        })
        .await?;
    Ok(())
}

pub async fn remove_saved_tracks(client: &CatalogClient, ids: &[&str]) -> Result<()> {
    client
        .execute_bulk(ids, MAX_TRACK_IDS, |chunk| async move {
            client
                .execute::<()>(ApiRequest::delete("/v1/me/tracks").query("ids", chunk.join(",")))
                .await?;
            Ok(Vec::<()>::new())
        })
        .await?;
    Ok(())
}

/// Whether each id is in the user's library. Never cached, since saves and
/// removals change it.
pub async fn contains_saved_tracks(client: &CatalogClient, ids: &[&str]) -> Result<Vec<bool>> {
    client
        .execute_bulk(ids, MAX_TRACK_IDS, |chunk| async move {
            let request = ApiRequest::get("/v1/me/tracks/contains")
                .query("ids", chunk.join(","))
                .uncached();
            client.execute::<Vec<bool>>(request).await
        })
        .await
}
