//! Album endpoints

use serde::Deserialize;

use super::client::CatalogClient;
use super::paging::{Page, PageHandle};
use super::request::ApiRequest;
use crate::error::Result;
use crate::models::{Album, SimpleTrack};

/// Ids accepted per call by the multi-album endpoint.
pub const MAX_ALBUM_IDS: usize = 20;

#[derive(Debug, Deserialize)]
struct AlbumsResponse {
    albums: Vec<Option<Album>>,
}

/// Album with its first page of tracks; page on with
/// `client.page(album.tracks)`.
pub async fn get_album(
    client: &CatalogClient,
    id: &str,
    market: Option<&str>,
) -> Result<Option<Album>> {
    let request = ApiRequest::get(format!("/v1/albums/{id}")).query_opt("market", market);
    client.execute_optional(request).await
}

pub async fn get_albums(
    client: &CatalogClient,
    ids: &[&str],
    market: Option<&str>,
) -> Result<Vec<Option<Album>>> {
    client
        .execute_bulk(ids, MAX_ALBUM_IDS, |chunk| async move {
            let request = ApiRequest::get("/v1/albums")
                .query("ids", chunk.join(","))
                .query_opt("market", market);
            let resp: AlbumsResponse = client.execute(request).await?;
            Ok(resp.albums)
        })
        .await
}

pub async fn album_tracks(
    client: &CatalogClient,
    id: &str,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<PageHandle<SimpleTrack>> {
    let request = ApiRequest::get(format!("/v1/albums/{id}/tracks"))
        .query("limit", limit.unwrap_or(client.options().default_page_limit))
        .query_opt("offset", offset);
    let page: Page<SimpleTrack> = client.execute(request).await?;
    Ok(client.page(page))
}
