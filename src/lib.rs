//! Client library for a catalog/streaming REST API
//!
//! [`CatalogClient`] owns the bearer token, a response cache and the retry
//! policies; endpoint modules under [`api`] are thin functions over it.
//!
//! ```no_run
//! use catalog_client::{api::tracks, CatalogClient, Credentials};
//!
//! # async fn run() -> catalog_client::Result<()> {
//! let client = CatalogClient::builder(Credentials::new("id").with_secret("secret"))
//!     .client_credentials()
//!     .build()?;
//! let track = tracks::get_track(&client, "4uLU6hMCjMI75M1A2tKUQC", None).await?;
//! println!("{:?}", track.map(|t| t.name));
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;

pub use api::{ApiRequest, CatalogClient, CatalogClientBuilder, Page, PageHandle, Paging};
pub use auth::{Credentials, GrantKind, RefreshListener, Refresher, Token};
pub use config::{ClientOptions, Config};
pub use error::{Error, Result};
