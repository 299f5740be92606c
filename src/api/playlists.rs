//! Playlist endpoints

use super::client::CatalogClient;
use super::paging::{Page, PageHandle};
use super::request::ApiRequest;
use crate::error::Result;
use crate::models::{Playlist, PlaylistItem, SimplePlaylist, Snapshot};

/// Items accepted per call when adding to a playlist.
pub const MAX_PLAYLIST_ADD: usize = 100;

pub async fn get_playlist(client: &CatalogClient, id: &str) -> Result<Option<Playlist>> {
    client
        .execute_optional(ApiRequest::get(format!("/v1/playlists/{id}")))
        .await
}

/// Tracks and episodes of a playlist, mixed.
pub async fn playlist_items(
    client: &CatalogClient,
    id: &str,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<PageHandle<PlaylistItem>> {
    let request = ApiRequest::get(format!("/v1/playlists/{id}/tracks"))
        .query("limit", limit.unwrap_or(client.options().default_page_limit))
        .query_opt("offset", offset)
        .query("additional_types", "track,episode");
    let page: Page<PlaylistItem> = client.execute(request).await?;
    Ok(client.page(page))
}

pub async fn my_playlists(
    client: &CatalogClient,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<PageHandle<SimplePlaylist>> {
    let request = ApiRequest::get("/v1/me/playlists")
        .query("limit", limit.unwrap_or(client.options().default_page_limit))
        .query_opt("offset", offset);
    let page: Page<SimplePlaylist> = client.execute(request).await?;
    Ok(client.page(page))
}

/// Append items by URI, in order. Chunks are sent one after another so the
/// playlist ends up in input order; returns the snapshot id after the last.
pub async fn add_items(
    client: &CatalogClient,
    playlist_id: &str,
    uris: &[&str],
) -> Result<Option<String>> {
    let snapshots = client
        .execute_bulk_sequential(uris, MAX_PLAYLIST_ADD, |chunk| async move {
            let request = ApiRequest::post(format!("/v1/playlists/{playlist_id}/tracks"))
                .json(&serde_json::json!({ "uris": chunk }))?;
            let snapshot: Snapshot = client.execute(request).await?;
            Ok(vec![snapshot.snapshot_id])
        })
        .await?;
    Ok(snapshots.into_iter().last())
}
