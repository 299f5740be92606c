//! Splitting of oversized "operate on N ids" requests
//!
//! Endpoints cap how many identifiers one call may carry. Over-ceiling input
//! is cut into ordered chunks that run concurrently; results come back in input
//! order whatever order the chunks finish in.

use std::future::Future;

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};

use super::client::CatalogClient;
use crate::error::{Error, Result};

/// Number of chunks `len` identifiers need under `ceiling`.
pub fn chunk_count(len: usize, ceiling: usize) -> usize {
    len.div_ceil(ceiling)
}

impl CatalogClient {
    /// Run `per_chunk` once per chunk of at most `ceiling` identifiers and
    /// concatenate the results in input order.
    ///
    /// Fails without sending anything when the input exceeds `ceiling` and
    /// bulk splitting is disabled. Empty input sends nothing.
    pub async fn execute_bulk<I, T, F, Fut>(
        &self,
        ids: &[I],
        ceiling: usize,
        per_chunk: F,
    ) -> Result<Vec<T>>
    where
        I: Clone,
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if !self.check_bulk(ids.len(), ceiling)? {
            return Ok(Vec::new());
        }

        let results = try_join_all(ids.chunks(ceiling).map(|chunk| per_chunk(chunk.to_vec()))).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Like [`execute_bulk`](Self::execute_bulk), but each chunk is sent only
    /// after the previous one succeeded. For writes whose effect depends on
    /// arrival order, such as appending to a playlist.
    pub async fn execute_bulk_sequential<I, T, F, Fut>(
        &self,
        ids: &[I],
        ceiling: usize,
        per_chunk: F,
    ) -> Result<Vec<T>>
    where
        I: Clone,
        F: Fn(Vec<I>) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if !self.check_bulk(ids.len(), ceiling)? {
            return Ok(Vec::new());
        }

        let results: Vec<Vec<T>> = stream::iter(ids.chunks(ceiling))
            .then(|chunk| per_chunk(chunk.to_vec()))
            .try_collect()
            .await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Whether anything needs sending for `len` identifiers.
    fn check_bulk(&self, len: usize, ceiling: usize) -> Result<bool> {
        if ceiling == 0 {
            return Err(Error::usage("bulk ceiling must be at least 1"));
        }
        if len == 0 {
            return Ok(false);
        }
        if len > ceiling && !self.options().allow_bulk_requests {
            return Err(Error::usage(format!(
                "too many identifiers: limit is {}, got {} (bulk requests are disabled)",
                ceiling, len
            )));
        }

        let chunks = chunk_count(len, ceiling);
        if chunks > 1 {
            tracing::debug!(
                "Splitting {} ids into {} chunks of at most {}",
                len,
                chunks,
                ceiling
            );
        }
        Ok(true)
    }
}
