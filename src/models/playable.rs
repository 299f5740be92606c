//! Items that can be played: tracks and podcast episodes

use serde::{Deserialize, Serialize};

use super::Track;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub duration_ms: u64,
    pub release_date: Option<String>,
}

/// Closed set of playable kinds, selected by the `type` field. Any other
/// `type` fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Playable {
    Track(Track),
    Episode(Episode),
}

impl Playable {
    pub fn uri(&self) -> &str {
        match self {
            Self::Track(t) => &t.uri,
            Self::Episode(e) => &e.uri,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Track(t) => &t.name,
            Self::Episode(e) => &e.name,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Track(t) => t.duration_ms,
            Self::Episode(e) => e.duration_ms,
        }
    }
}
