//! Playlist models

use serde::{Deserialize, Serialize};

use super::Playable;
use crate::api::paging::Page;

/// Link to a playlist's items, as listed in playlist collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItemsRef {
    pub href: String,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplePlaylist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub tracks: PlaylistItemsRef,
}

/// Playlist entry; `track` is null for items that are no longer available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub added_at: Option<String>,
    pub track: Option<Playable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub snapshot_id: Option<String>,
    pub tracks: Page<PlaylistItem>,
}

/// Response of playlist modifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
}
