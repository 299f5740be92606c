//! API client for the catalog service
//!
//! [`client`] is the request execution core; [`cache`], [`bulk`] and
//! [`paging`] hang off it. The remaining modules are endpoint methods.

pub mod albums;
pub mod artists;
pub mod bulk;
pub mod cache;
pub mod client;
pub mod paging;
pub mod playlists;
pub mod request;
pub mod tracks;

pub use cache::{CacheKey, ResponseCache};
pub use client::{CatalogClient, CatalogClientBuilder};
pub use paging::{CursorPage, Cursors, Page, PageHandle, Paging};
pub use request::{ApiRequest, Body};
