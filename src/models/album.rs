//! Album models

use serde::{Deserialize, Serialize};

use super::{SimpleArtist, SimpleTrack};
use crate::api::paging::Page;

/// Album reference embedded in tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleAlbum {
    pub id: Option<String>,
    pub name: String,
    pub uri: Option<String>,
    pub album_type: Option<String>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
}

/// Full album, with the first page of its tracks inline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub album_type: Option<String>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
    pub tracks: Page<SimpleTrack>,
}
