//! Data models for catalog entities
//!
//! Only the shapes the bundled endpoints return. Fields the API may omit are
//! `Option` or defaulted.

mod album;
mod artist;
mod playable;
mod playlist;
mod track;

pub use album::*;
pub use artist::*;
pub use playable::*;
pub use playlist::*;
pub use track::*;
