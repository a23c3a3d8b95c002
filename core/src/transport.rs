//! Session-scoped HTTP transport.
//!
//! # Design
//! A `Transport` owns one `reqwest::Client`, i.e. one connection pool, shared
//! by every handle bound to it. The pool is created on `open` or lazily on
//! the first request and released on `close` or drop. `Closed` is terminal:
//! once closed, every request fails with `Error::Closed`.
//!
//! The session lock only guards the state swap and is never held across an
//! `.await`. Requests clone the pool handle out of the lock, so concurrent
//! requests run independently and requests already in flight when `close`
//! runs finish on their own clone.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::redirect::Policy;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{HttpRequest, HttpResponse};

#[derive(Debug)]
enum Session {
    Idle,
    Open(reqwest::Client),
    Closed,
}

/// Issues requests against one MeiliSearch server.
#[derive(Debug)]
pub struct Transport {
    config: Config,
    session: Mutex<Session>,
}

impl Transport {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session: Mutex::new(Session::Idle),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the connection pool now instead of on the first request.
    /// Opening an already open transport is a no-op.
    pub fn open(&self) -> Result<()> {
        self.client().map(|_| ())
    }

    /// Release the connection pool. Later requests fail with `Error::Closed`.
    pub fn close(&self) {
        let mut session = self.lock();
        if !matches!(*session, Session::Closed) {
            info!(url = %self.config.url, "closing MeiliSearch session");
        }
        *session = Session::Closed;
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.lock(), Session::Closed)
    }

    /// Execute `request` and decode the JSON answer.
    pub async fn send(&self, request: HttpRequest) -> Result<Value> {
        self.execute(request).await?.into_json()
    }

    /// Execute `request` and return the raw status and body.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client()?;
        let url = format!("{}/{}", self.config.url, request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = client.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(Error::from_transport)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(Error::from_transport)?;
        debug!(method = %request.method, %url, status, "received response");

        Ok(HttpResponse { status, body })
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The pool handle, created on first use.
    fn client(&self) -> Result<reqwest::Client> {
        let mut session = self.lock();
        match &*session {
            Session::Open(client) => Ok(client.clone()),
            Session::Closed => Err(Error::Closed),
            Session::Idle => {
                let client = build_client(&self.config)?;
                info!(url = %self.config.url, "opened MeiliSearch session");
                *session = Session::Open(client.clone());
                Ok(client)
            }
        }
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    if let Some(key) = &config.api_key {
        let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|e| Error::Configuration(format!("API key is not a valid header value: {e}")))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    // A 3xx is returned to the caller as `Error::Api`, never followed.
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .redirect(Policy::none());
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(Error::from_transport)
}
