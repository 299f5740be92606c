//! Logical request built by endpoint methods

use reqwest::Method;
use serde::Serialize;

use crate::error::Result;

/// Request body, already encoded so it can be resent and hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Json(String),
    Form(Vec<(String, String)>),
}

impl Body {
    pub(crate) fn as_bytes(&self) -> Vec<u8> {
        match self {
            Self::Json(s) => s.as_bytes().to_vec(),
            Self::Form(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&")
                .into_bytes(),
        }
    }
}

/// One logical call: verb, target, parameters, and whether the response may
/// be served from the cache.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, or an absolute URL (paging links)
    pub target: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
    pub cacheable: bool,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let cacheable = method == Method::GET;
        Self {
            method,
            target: target.into(),
            query: Vec::new(),
            body: None,
            cacheable,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add the parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(Body::Json(serde_json::to_string(body)?));
        Ok(self)
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = Some(Body::Form(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ));
        self
    }

    /// Opt out of caching for a read whose result must be live.
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Only GETs are served from or stored into the cache.
    pub fn is_cacheable(&self) -> bool {
        self.cacheable && self.method == Method::GET
    }

    /// Whether a success should invalidate cached reads of the same resource.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD | Method::OPTIONS)
    }
}
