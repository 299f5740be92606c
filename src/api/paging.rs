//! Paged result sets
//!
//! [`Page`] (offset/limit links) and [`CursorPage`] (opaque forward cursors)
//! are plain data as returned by the API. A [`PageHandle`] pairs one of them
//! with the client so adjacent pages can be fetched; each fetch returns a new
//! handle and never mutates the old one.

use futures::stream::{self, BoxStream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::client::CatalogClient;
use super::request::ApiRequest;
use crate::error::{Error, Result};

/// Offset-based page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub href: String,
    pub items: Vec<T>,
    pub limit: u32,
    pub next: Option<String>,
    pub offset: u32,
    pub previous: Option<String>,
    pub total: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

/// Opaque cursors of a [`CursorPage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    pub after: Option<String>,
    pub before: Option<String>,
}

/// Cursor-based page. Can only be walked forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub href: String,
    pub items: Vec<T>,
    pub limit: u32,
    pub next: Option<String>,
    #[serde(default)]
    pub cursors: Option<Cursors>,
    pub total: Option<u32>,
}

impl<T> CursorPage<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Cursor to resume after this page, if the server sent one.
    pub fn after(&self) -> Option<&str> {
        self.cursors.as_ref().and_then(|c| c.after.as_deref())
    }
}

/// Either page kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paging<T> {
    Offset(Page<T>),
    Cursor(CursorPage<T>),
}

impl<T> Paging<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Offset(p) => &p.items,
            Self::Cursor(p) => &p.items,
        }
    }

    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Offset(p) => p.items,
            Self::Cursor(p) => p.items,
        }
    }

    pub fn href(&self) -> &str {
        match self {
            Self::Offset(p) => &p.href,
            Self::Cursor(p) => &p.href,
        }
    }

    pub fn next_url(&self) -> Option<&str> {
        match self {
            Self::Offset(p) => p.next.as_deref(),
            Self::Cursor(p) => p.next.as_deref(),
        }
    }

    pub fn total(&self) -> Option<u32> {
        match self {
            Self::Offset(p) => Some(p.total),
            Self::Cursor(p) => p.total,
        }
    }

    fn is_cursor(&self) -> bool {
        matches!(self, Self::Cursor(_))
    }
}

impl<T> From<Page<T>> for Paging<T> {
    fn from(page: Page<T>) -> Self {
        Self::Offset(page)
    }
}

impl<T> From<CursorPage<T>> for Paging<T> {
    fn from(page: CursorPage<T>) -> Self {
        Self::Cursor(page)
    }
}

/// A page plus what is needed to fetch its neighbours.
#[derive(Debug, Clone)]
pub struct PageHandle<T> {
    client: CatalogClient,
    page: Paging<T>,
    /// Key wrapping the page object in linked responses, e.g. `"artists"`
    envelope: Option<String>,
}

impl CatalogClient {
    pub fn page<T>(&self, page: impl Into<Paging<T>>) -> PageHandle<T> {
        PageHandle {
            client: self.clone(),
            page: page.into(),
            envelope: None,
        }
    }

    /// For endpoints whose linked pages arrive wrapped as `{ "<key>": page }`.
    pub fn page_in<T>(&self, page: impl Into<Paging<T>>, envelope: &str) -> PageHandle<T> {
        PageHandle {
            envelope: Some(envelope.to_string()),
            ..self.page(page)
        }
    }
}

impl<T> PageHandle<T> {
    pub fn page(&self) -> &Paging<T> {
        &self.page
    }

    pub fn items(&self) -> &[T] {
        self.page.items()
    }

    pub fn into_page(self) -> Paging<T> {
        self.page
    }

    pub fn has_next(&self) -> bool {
        self.page.next_url().is_some()
    }

    pub fn has_previous(&self) -> bool {
        match &self.page {
            Paging::Offset(p) => p.has_previous(),
            Paging::Cursor(_) => false,
        }
    }
}

impl<T> PageHandle<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Following page, or `None` on the last one.
    pub async fn next(&self) -> Result<Option<Self>> {
        match self.page.next_url() {
            Some(url) => self.fetch(url).await.map(Some),
            None => Ok(None),
        }
    }

    /// Preceding page, or `None` on the first one. Cursor pages have no way
    /// back and always fail with `UnsupportedOperation`.
    pub async fn previous(&self) -> Result<Option<Self>> {
        match &self.page {
            Paging::Offset(p) => match p.previous.as_deref() {
                Some(url) => self.fetch(url).await.map(Some),
                None => Ok(None),
            },
            Paging::Cursor(_) => Err(backward_unsupported()),
        }
    }

    /// This page followed by up to `count - 1` next pages.
    pub async fn take_pages(&self, count: usize) -> Result<Vec<Self>> {
        let mut pages = Vec::with_capacity(count);
        if count == 0 {
            return Ok(pages);
        }

        let mut current = self.clone();
        while pages.len() + 1 < count {
            match current.next().await? {
                Some(next) => pages.push(std::mem::replace(&mut current, next)),
                None => break,
            }
        }
        pages.push(current);
        Ok(pages)
    }

    /// Every page of the collection in document order. Offset pages walk back
    /// to the first page, then forward to the last; cursor pages start here.
    pub async fn all_pages(&self) -> Result<Vec<Self>> {
        let mut pages = Vec::new();

        if !self.page.is_cursor() {
            let mut current = self.clone();
            while let Some(prev) = current.previous().await? {
                pages.push(prev.clone());
                current = prev;
            }
            pages.reverse();
        }

        let mut current = self.clone();
        while let Some(next) = current.next().await? {
            pages.push(std::mem::replace(&mut current, next));
        }
        pages.push(current);

        tracing::debug!("Collected {} pages from {}", pages.len(), self.page.href());
        Ok(pages)
    }

    /// Items of [`all_pages`](Self::all_pages), flattened.
    pub async fn all_items(&self) -> Result<Vec<T>> {
        Ok(self
            .all_pages()
            .await?
            .into_iter()
            .flat_map(|p| p.page.into_items())
            .collect())
    }

    /// Lazily yields this page, then each following page. Every call starts
    /// over from this page.
    pub fn pages_forward(&self) -> BoxStream<'static, Result<Self>> {
        stream::try_unfold((self.clone(), true), |(current, first)| async move {
            if first {
                return Ok(Some((current.clone(), (current, false))));
            }
            Ok(current.next().await?.map(|next| (next.clone(), (next, false))))
        })
        .boxed()
    }

    /// Lazily yields this page, then each preceding page. On a cursor page the
    /// only item is an `UnsupportedOperation` error.
    pub fn pages_backward(&self) -> BoxStream<'static, Result<Self>> {
        if self.page.is_cursor() {
            return stream::once(async { Err(backward_unsupported()) }).boxed();
        }

        stream::try_unfold((self.clone(), true), |(current, first)| async move {
            if first {
                return Ok(Some((current.clone(), (current, false))));
            }
            Ok(current.previous().await?.map(|prev| (prev.clone(), (prev, false))))
        })
        .boxed()
    }

    async fn fetch(&self, url: &str) -> Result<Self> {
        let request = ApiRequest::get(url);
        let value: serde_json::Value = self.client.execute(request.clone()).await?;
        self.parse(value).inspect_err(|_| self.client.forget(&request))
    }

    fn parse(&self, mut value: serde_json::Value) -> Result<Self> {
        if let Some(key) = &self.envelope {
            value = value
                .get_mut(key.as_str())
                .map(serde_json::Value::take)
                .ok_or_else(|| Error::Serialization(format!("page response has no \"{key}\" field")))?;
        }

        let page = match &self.page {
            Paging::Offset(_) => {
                let page: Page<T> = serde_json::from_value(value)?;
                if page.limit > 0 && page.items.len() > page.limit as usize {
                    return Err(Error::Serialization(format!(
                        "page holds {} items but its limit is {}",
                        page.items.len(),
                        page.limit
                    )));
                }
                Paging::Offset(page)
            }
            Paging::Cursor(_) => Paging::Cursor(serde_json::from_value(value)?),
        };

        Ok(Self {
            client: self.client.clone(),
            page,
            envelope: self.envelope.clone(),
        })
    }
}

fn backward_unsupported() -> Error {
    Error::UnsupportedOperation("cursor-based pages cannot be traversed backward".into())
}
