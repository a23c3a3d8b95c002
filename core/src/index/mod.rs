//! Handle for one MeiliSearch index.
//!
//! # Design
//! An `Index` is the index uid plus a shared reference to the `Transport`.
//! It has no lifecycle of its own: dropping it releases nothing, and closing
//! the transport invalidates every handle bound to it. Methods are split
//! across this module (index lifecycle, updates, search), `documents` and
//! `settings`.

mod documents;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::paths;
use crate::error::{Error, Result};
use crate::http::{path_segment, HttpRequest};
use crate::task;
use crate::transport::Transport;
use crate::types::{IndexInfo, IndexOptions};

/// A MeiliSearch index, bound to a transport.
#[derive(Debug, Clone)]
pub struct Index {
    transport: Arc<Transport>,
    pub uid: String,
    pub primary_key: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct CreateIndexBody<'a> {
    uid: &'a str,
    #[serde(flatten)]
    options: &'a IndexOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateIndexBody<'a> {
    primary_key: &'a str,
}

impl Index {
    /// A local reference to `uid`. No request is made and the index need not
    /// exist yet.
    pub fn new(transport: Arc<Transport>, uid: impl Into<String>) -> Self {
        Self {
            transport,
            uid: uid.into(),
            primary_key: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn from_info(transport: Arc<Transport>, info: IndexInfo) -> Self {
        let mut index = Self::new(transport, info.uid.clone());
        index.apply(info);
        index
    }

    /// Create the index on the server.
    pub async fn create(
        transport: Arc<Transport>,
        uid: &str,
        options: Option<&IndexOptions>,
    ) -> Result<Self> {
        let default = IndexOptions::default();
        let body = CreateIndexBody {
            uid,
            options: options.unwrap_or(&default),
        };
        let response = transport
            .send(HttpRequest::post_json(paths::INDEXES, &body)?)
            .await?;
        let info = parse_info(response)?;
        Ok(Self::from_info(transport, info))
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    fn apply(&mut self, info: IndexInfo) {
        self.primary_key = info.primary_key;
        self.created_at = info.created_at;
        self.updated_at = info.updated_at;
    }

    pub(crate) fn path(&self) -> String {
        format!("{}/{}", paths::INDEXES, path_segment(&self.uid))
    }

    pub(crate) fn sub_path(&self, segment: &str) -> String {
        format!("{}/{}/{segment}", paths::INDEXES, path_segment(&self.uid))
    }

    /// Delete the index. The server answers with an empty body, which comes
    /// back as `Value::Null`.
    pub async fn delete(&self) -> Result<Value> {
        self.transport.send(HttpRequest::delete(self.path())).await
    }

    /// Delete the index, returning `false` if it did not exist.
    pub async fn delete_if_exists(&self) -> Result<bool> {
        match self.delete().await {
            Ok(_) => Ok(true),
            Err(err) if err.api_code() == Some("index_not_found") => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Change the primary key and refresh the local metadata.
    pub async fn update(&mut self, primary_key: &str) -> Result<()> {
        let body = UpdateIndexBody { primary_key };
        let response = self
            .transport
            .send(HttpRequest::put_json(self.path(), &body)?)
            .await?;
        self.apply(parse_info(response)?);
        Ok(())
    }

    /// Reload primary key and timestamps from the server.
    pub async fn fetch_info(&mut self) -> Result<()> {
        let response = self.transport.send(HttpRequest::get(self.path())).await?;
        self.apply(parse_info(response)?);
        Ok(())
    }

    pub async fn get_primary_key(&mut self) -> Result<Option<String>> {
        self.fetch_info().await?;
        Ok(self.primary_key.clone())
    }

    pub async fn get_all_update_status(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(self.sub_path(paths::UPDATES)))
            .await
    }

    pub async fn get_update_status(&self, update_id: u64) -> Result<Value> {
        let path = format!("{}/{update_id}", self.sub_path(paths::UPDATES));
        self.transport.send(HttpRequest::get(path)).await
    }

    /// Poll the update until it is processed or failed.
    ///
    /// Defaults: 5 s timeout, 50 ms between polls.
    pub async fn wait_for_pending_update(
        &self,
        update_id: u64,
        timeout: Option<Duration>,
        interval: Option<Duration>,
    ) -> Result<Value> {
        let what = format!("update {update_id} of index {}", self.uid);
        task::wait_until_settled(&what, timeout, interval, || {
            self.get_update_status(update_id)
        })
        .await
    }

    pub async fn get_stats(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(self.sub_path(paths::STATS)))
            .await
    }

    /// Search the index. `opt_params` are merged into the body next to `q`,
    /// e.g. `limit`, `filter`, `attributesToHighlight`.
    pub async fn search(&self, query: &str, opt_params: Option<&Map<String, Value>>) -> Result<Value> {
        let mut body = Map::new();
        body.insert("q".to_string(), Value::String(query.to_string()));
        if let Some(params) = opt_params {
            body.extend(params.clone());
        }
        self.transport
            .send(HttpRequest::post_json(self.sub_path(paths::SEARCH), &body)?)
            .await
    }
}

fn parse_info(value: Value) -> Result<IndexInfo> {
    serde_json::from_value(value).map_err(|e| Error::Deserialization(e.to_string()))
}

/// Borrow a slice of string-likes as `&str` for serialization.
fn as_strs<S: AsRef<str>>(items: &[S]) -> Vec<&str> {
    items.iter().map(AsRef::as_ref).collect()
}
