//! Track models

use serde::{Deserialize, Serialize};

use super::{SimpleAlbum, SimpleArtist};

/// Track as listed inside an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleTrack {
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    pub track_number: Option<u32>,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
}

/// Full track. Local files have no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub is_local: bool,
    pub popularity: Option<u32>,
    pub album: Option<SimpleAlbum>,
    #[serde(default)]
    pub artists: Vec<SimpleArtist>,
}

/// Entry of the user's library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTrack {
    pub added_at: String,
    pub track: Track,
}
