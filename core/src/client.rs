//! Entry point: server-wide operations and index handles.
//!
//! # Design
//! `Client` owns the `Transport` behind an `Arc` and hands clones of that
//! `Arc` to every `Index` it produces, so all handles share one connection
//! pool. Cloning a `Client` is cheap and shares the pool too. Closing any
//! clone closes the pool for all of them.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::{paths, Config};
use crate::error::{Error, Result};
use crate::http::{path_segment, HttpRequest};
use crate::index::Index;
use crate::task;
use crate::transport::Transport;
use crate::types::{IndexInfo, IndexOptions};

/// Asynchronous client for a MeiliSearch server.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<Transport>,
}

impl Client {
    /// Shorthand for `from_config` with `Config::new(url)` plus an optional
    /// key and timeout.
    pub fn new(url: &str, api_key: Option<&str>, timeout: Option<Duration>) -> Self {
        let mut config = Config::new(url);
        config.api_key = api_key.map(str::to_string);
        config.timeout = timeout;
        Self::from_config(config)
    }

    /// Client over a fresh transport for `config`. `url` is the server root,
    /// e.g. `http://localhost:7700`.
    pub fn from_config(config: Config) -> Self {
        Self {
            transport: Arc::new(Transport::new(config)),
        }
    }

    pub fn config(&self) -> &Config {
        self.transport.config()
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Open the connection pool eagerly. Requests open it on demand otherwise.
    pub fn open(&self) -> Result<()> {
        self.transport.open()
    }

    /// Close the connection pool. Every later call on this client, its clones,
    /// or its indexes fails with `Error::Closed`.
    pub fn close(&self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// A local handle for `uid`, without any request.
    pub fn index(&self, uid: &str) -> Index {
        Index::new(Arc::clone(&self.transport), uid)
    }

    pub async fn create_index(&self, uid: &str, options: Option<&IndexOptions>) -> Result<Index> {
        Index::create(Arc::clone(&self.transport), uid, options).await
    }

    /// Fetch an existing index with its metadata.
    pub async fn get_index(&self, uid: &str) -> Result<Index> {
        let mut index = self.index(uid);
        index.fetch_info().await?;
        Ok(index)
    }

    pub async fn get_raw_index(&self, uid: &str) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(format!("{}/{}", paths::INDEXES, path_segment(uid))))
            .await
    }

    pub async fn get_indexes(&self) -> Result<Vec<Index>> {
        let response = self.get_raw_indexes().await?;
        let infos: Vec<IndexInfo> =
            serde_json::from_value(response).map_err(|e| Error::Deserialization(e.to_string()))?;
        Ok(infos
            .into_iter()
            .map(|info| Index::from_info(Arc::clone(&self.transport), info))
            .collect())
    }

    pub async fn get_raw_indexes(&self) -> Result<Value> {
        self.transport.send(HttpRequest::get(paths::INDEXES)).await
    }

    /// Fetch the index, creating it when the server reports `index_not_found`.
    pub async fn get_or_create_index(&self, uid: &str, options: Option<&IndexOptions>) -> Result<Index> {
        match self.get_index(uid).await {
            Ok(index) => Ok(index),
            Err(err) if err.api_code() == Some("index_not_found") => {
                self.create_index(uid, options).await
            }
            Err(err) => Err(err),
        }
    }

    /// Delete the index, returning `false` if it did not exist.
    pub async fn delete_index_if_exists(&self, uid: &str) -> Result<bool> {
        self.index(uid).delete_if_exists().await
    }

    /// Database size and per-index statistics.
    pub async fn get_all_stats(&self) -> Result<Value> {
        self.transport.send(HttpRequest::get(paths::STATS)).await
    }

    pub async fn health(&self) -> Result<Value> {
        self.transport.send(HttpRequest::get(paths::HEALTH)).await
    }

    /// `true` when `health` succeeds; any error counts as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn get_keys(&self) -> Result<Value> {
        self.transport.send(HttpRequest::get(paths::KEYS)).await
    }

    pub async fn get_version(&self) -> Result<Value> {
        self.transport.send(HttpRequest::get(paths::VERSION)).await
    }

    /// Alias of `get_version`.
    pub async fn version(&self) -> Result<Value> {
        self.get_version().await
    }

    /// Start a dump. The answer carries the dump `uid`.
    pub async fn create_dump(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::post_empty(paths::DUMPS))
            .await
    }

    pub async fn get_dump_status(&self, uid: &str) -> Result<Value> {
        let path = format!("{}/{}/status", paths::DUMPS, path_segment(uid));
        self.transport.send(HttpRequest::get(path)).await
    }

    /// All tasks, or only those of `index_uid`.
    pub async fn get_tasks(&self, index_uid: Option<&str>) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(task::task_path(index_uid, None)))
            .await
    }

    pub async fn get_task(&self, uid: u64, index_uid: Option<&str>) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(task::task_path(index_uid, Some(uid))))
            .await
    }

    /// Poll the task until it succeeds or fails.
    ///
    /// Defaults: 5 s timeout, 50 ms between polls.
    pub async fn wait_for_task(
        &self,
        uid: u64,
        timeout: Option<Duration>,
        interval: Option<Duration>,
    ) -> Result<Value> {
        let what = format!("task {uid}");
        task::wait_until_settled(&what, timeout, interval, || self.get_task(uid, None)).await
    }
}
