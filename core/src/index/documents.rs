use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use super::Index;
use crate::config::paths;
use crate::error::{Error, Result};
use crate::http::{path_segment, HttpRequest, CONTENT_TYPE_CSV, CONTENT_TYPE_JSON, CONTENT_TYPE_NDJSON};
use crate::types::DocumentsQuery;

impl Index {
    fn documents_path(&self) -> String {
        self.sub_path(paths::DOCUMENTS)
    }

    fn document_path(&self, document_id: impl Display) -> String {
        format!("{}/{}", self.documents_path(), path_segment(&document_id.to_string()))
    }

    pub async fn get_document(&self, document_id: impl Display) -> Result<Value> {
        self.transport
            .send(HttpRequest::get(self.document_path(document_id)))
            .await
    }

    pub async fn get_documents(&self, query: Option<&DocumentsQuery>) -> Result<Value> {
        let mut request = HttpRequest::get(self.documents_path());
        if let Some(query) = query {
            request.query = query.query_pairs();
        }
        self.transport.send(request).await
    }

    /// Add or replace documents. Answers with an update identifier.
    pub async fn add_documents<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<Value> {
        let request = HttpRequest::post_json(self.documents_path(), documents)?
            .with_optional_query("primaryKey", primary_key);
        self.transport.send(request).await
    }

    /// `add_documents` once per chunk of `batch_size`, in order.
    pub async fn add_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut updates = Vec::new();
        for batch in batches(documents, batch_size)? {
            updates.push(self.add_documents(batch, primary_key).await?);
        }
        Ok(updates)
    }

    /// Add documents from an already-encoded JSON array.
    pub async fn add_documents_json(
        &self,
        documents: impl Into<String>,
        primary_key: Option<&str>,
    ) -> Result<Value> {
        self.add_documents_raw(documents, primary_key, CONTENT_TYPE_JSON)
            .await
    }

    pub async fn add_documents_csv(
        &self,
        documents: impl Into<String>,
        primary_key: Option<&str>,
    ) -> Result<Value> {
        self.add_documents_raw(documents, primary_key, CONTENT_TYPE_CSV)
            .await
    }

    pub async fn add_documents_ndjson(
        &self,
        documents: impl Into<String>,
        primary_key: Option<&str>,
    ) -> Result<Value> {
        self.add_documents_raw(documents, primary_key, CONTENT_TYPE_NDJSON)
            .await
    }

    /// Send `documents` verbatim with the given content type.
    pub async fn add_documents_raw(
        &self,
        documents: impl Into<String>,
        primary_key: Option<&str>,
        content_type: &str,
    ) -> Result<Value> {
        let request = HttpRequest::post_raw(self.documents_path(), documents, content_type)
            .with_optional_query("primaryKey", primary_key);
        self.transport.send(request).await
    }

    /// Add documents or partially update existing ones.
    pub async fn update_documents<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<Value> {
        let request = HttpRequest::put_json(self.documents_path(), documents)?
            .with_optional_query("primaryKey", primary_key);
        self.transport.send(request).await
    }

    pub async fn update_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut updates = Vec::new();
        for batch in batches(documents, batch_size)? {
            updates.push(self.update_documents(batch, primary_key).await?);
        }
        Ok(updates)
    }

    pub async fn delete_document(&self, document_id: impl Display) -> Result<Value> {
        self.transport
            .send(HttpRequest::delete(self.document_path(document_id)))
            .await
    }

    /// Delete several documents by id in one update.
    pub async fn delete_documents<I: Serialize>(&self, ids: &[I]) -> Result<Value> {
        let path = format!("{}/delete-batch", self.documents_path());
        self.transport
            .send(HttpRequest::post_json(path, ids)?)
            .await
    }

    pub async fn delete_all_documents(&self) -> Result<Value> {
        self.transport
            .send(HttpRequest::delete(self.documents_path()))
            .await
    }
}

fn batches<T>(documents: &[T], batch_size: usize) -> Result<std::slice::Chunks<'_, T>> {
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch_size must be at least 1".to_string()));
    }
    Ok(documents.chunks(batch_size))
}
