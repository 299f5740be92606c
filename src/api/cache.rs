//! Response cache for idempotent requests
//!
//! Bounded by insertion order: once the limit is exceeded the oldest entry is
//! dropped. Reads do not move entries.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

use super::request::Body;

/// Request signature: method, full URL and a hash of the body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: String,
    url: String,
    path: String,
    body_hash: Option<String>,
}

impl CacheKey {
    pub fn new(method: &Method, url: &Url, body: Option<&Body>) -> Self {
        let body_hash = body.map(|b| URL_SAFE_NO_PAD.encode(Sha256::digest(b.as_bytes())));
        Self {
            method: method.as_str().to_string(),
            url: url.as_str().to_string(),
            path: url.path().to_string(),
            body_hash,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// URL path the request addresses, ignoring the query.
    pub fn resource_path(&self) -> &str {
        &self.path
    }
}

#[derive(Default)]
struct Entries {
    bodies: HashMap<CacheKey, String>,
    order: VecDeque<CacheKey>,
}

impl Entries {
    fn remove(&mut self, key: &CacheKey) -> bool {
        if self.bodies.remove(key).is_none() {
            return false;
        }
        self.order.retain(|k| k != key);
        true
    }
}

/// Shared by every in-flight request of a client. All mutation happens under
/// one lock, so readers never see a half-applied insert or eviction.
pub struct ResponseCache {
    enabled: bool,
    limit: Option<usize>,
    entries: Mutex<Entries>,
}

impl ResponseCache {
    /// `limit: None` never evicts.
    pub fn new(enabled: bool, limit: Option<usize>) -> Self {
        Self {
            enabled,
            limit,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<String> {
        if !self.enabled {
            return None;
        }
        self.entries().bodies.get(key).cloned()
    }

    pub fn put(&self, key: CacheKey, body: String) {
        if !self.enabled {
            return;
        }

        let mut entries = self.entries();
        entries.remove(&key);
        entries.order.push_back(key.clone());
        entries.bodies.insert(key, body);

        if let Some(limit) = self.limit {
            while entries.order.len() > limit {
                if let Some(oldest) = entries.order.pop_front() {
                    tracing::debug!("Cache evicting {}", oldest.url());
                    entries.bodies.remove(&oldest);
                }
            }
        }
    }

    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries().remove(key)
    }

    /// Drop every entry addressing `path`, whatever its query or verb.
    pub fn invalidate_resource(&self, path: &str) -> usize {
        let mut entries = self.entries();
        let before = entries.order.len();
        entries.order.retain(|k| k.resource_path() != path);
        entries.bodies.retain(|k, _| k.resource_path() != path);
        before - entries.order.len()
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        entries.bodies.clear();
        entries.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
