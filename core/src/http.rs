//! Plain-data HTTP requests and responses.
//!
//! # Design
//! Handles never talk to the network themselves. Each operation builds an
//! `HttpRequest` value, hands it to the `Transport`, and gets back a decoded
//! `serde_json::Value`. Status interpretation lives in
//! `HttpResponse::into_json`, a pure function, so it can be exercised without
//! a server.
//!
//! Paths are relative to the configured base URL (`indexes/movies/search`,
//! not `http://host/indexes/movies/search`); the transport joins them.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, Error};

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Unreserved characters (RFC 3986) pass through; everything else is escaped.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escape a caller-supplied value (index uid, document id) for use as one
/// path segment, so `/`, `?` and `#` cannot change the route.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}
pub const CONTENT_TYPE_CSV: &str = "text/csv";
pub const CONTENT_TYPE_NDJSON: &str = "application/x-ndjson";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    fn bare(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json<B: Serialize + ?Sized>(
        method: HttpMethod,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Self, Error> {
        let body = serde_json::to_string(body).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            headers: vec![("content-type".to_string(), CONTENT_TYPE_JSON.to_string())],
            body: Some(body),
            ..Self::bare(method, path)
        })
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::bare(HttpMethod::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::bare(HttpMethod::Delete, path)
    }

    /// POST without a body, e.g. to trigger a dump.
    pub fn post_empty(path: impl Into<String>) -> Self {
        Self::bare(HttpMethod::Post, path)
    }

    pub fn post_json<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::json(HttpMethod::Post, path, body)
    }

    pub fn put_json<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::json(HttpMethod::Put, path, body)
    }

    pub fn patch_json<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::json(HttpMethod::Patch, path, body)
    }

    pub fn delete_json<B: Serialize + ?Sized>(path: impl Into<String>, body: &B) -> Result<Self, Error> {
        Self::json(HttpMethod::Delete, path, body)
    }

    /// POST an already-encoded payload (CSV, NDJSON, raw JSON) as-is.
    pub fn post_raw(path: impl Into<String>, body: impl Into<String>, content_type: &str) -> Self {
        Self {
            headers: vec![("content-type".to_string(), content_type.to_string())],
            body: Some(body.into()),
            ..Self::bare(HttpMethod::Post, path)
        }
    }

    /// Append a query parameter. Encoding happens in the transport.
    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_optional_query(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with_query(key, value),
            None => self,
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Map the response to the decoded payload or the matching error.
    ///
    /// Any 2xx is a success; an empty success body decodes to `Value::Null`.
    pub fn into_json(self) -> Result<Value, Error> {
        if !(200..300).contains(&self.status) {
            return Err(Error::Api(ApiError::from_response(self.status, &self.body)));
        }
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
