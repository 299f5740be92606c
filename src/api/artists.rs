//! Artist endpoints, including the cursor-paged followed-artists list

use serde::Deserialize;

use super::client::CatalogClient;
use super::paging::{CursorPage, PageHandle};
use super::request::ApiRequest;
use crate::error::Result;
use crate::models::Artist;

/// Ids accepted per call by the multi-artist and follow endpoints.
pub const MAX_ARTIST_IDS: usize = 50;

/// Followed artists arrive wrapped in this key, linked pages included.
const FOLLOWING_ENVELOPE: &str = "artists";

#[derive(Debug, Deserialize)]
struct ArtistsResponse {
    artists: Vec<Option<Artist>>,
}

#[derive(Debug, Deserialize)]
struct FollowingResponse {
    artists: CursorPage<Artist>,
}

pub async fn get_artist(client: &CatalogClient, id: &str) -> Result<Option<Artist>> {
    client
        .execute_optional(ApiRequest::get(format!("/v1/artists/{id}")))
        .await
}

pub async fn get_artists(client: &CatalogClient, ids: &[&str]) -> Result<Vec<Option<Artist>>> {
    client
        .execute_bulk(ids, MAX_ARTIST_IDS, |chunk| async move {
            let request = ApiRequest::get("/v1/artists").query("ids", chunk.join(","));
            let resp: ArtistsResponse = client.execute(request).await?;
            Ok(resp.artists)
        })
        .await
}

/// Artists the user follows. Cursor-paged: forward only.
pub async fn followed_artists(
    client: &CatalogClient,
    limit: Option<u32>,
    after: Option<&str>,
) -> Result<PageHandle<Artist>> {
    let request = ApiRequest::get("/v1/me/following")
        .query("type", "artist")
        .query("limit", limit.unwrap_or(client.options().default_page_limit))
        .query_opt("after", after);
    let resp: FollowingResponse = client.execute(request).await?;
    Ok(client.page_in(resp.artists, FOLLOWING_ENVELOPE))
}

pub async fn follow_artists(client: &CatalogClient, ids: &[&str]) -> Result<()> {
    set_following(client, ids, true).await
}

pub async fn unfollow_artists(client: &CatalogClient, ids: &[&str]) -> Result<()> {
    set_following(client, ids, false).await
}

async fn set_following(client: &CatalogClient, ids: &[&str], follow: bool) -> Result<()> {
    client
        .execute_bulk(ids, MAX_ARTIST_IDS, |chunk| async move {
            let request = if follow {
                ApiRequest::put("/v1/me/following")
            } else {
                ApiRequest::delete("/v1/me/following")
            };
            client
                .execute::<()>(request.query("type", "artist").query("ids", chunk.join(",")))
                .await?;
            Ok(Vec::<()>::new())
        })
        .await?;
    Ok(())
}
