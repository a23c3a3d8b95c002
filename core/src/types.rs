//! Typed payloads for the few places the client reads or writes structure.
//!
//! Everything else travels as `serde_json::Value`; the server owns the schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index metadata as returned by `GET /indexes` and `GET /indexes/{uid}`.
///
/// MeiliSearch emits timestamps with up to nine fractional digits; they parse
/// without truncation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub uid: String,
    #[serde(default)]
    pub primary_key: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Options accepted when creating an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
}

impl IndexOptions {
    pub fn primary_key(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: Some(primary_key.into()),
        }
    }
}

/// Pagination and projection for `GET /indexes/{uid}/documents`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentsQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub attributes_to_retrieve: Option<Vec<String>>,
}

impl DocumentsQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_attributes_to_retrieve<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes_to_retrieve = Some(attributes.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(attributes) = &self.attributes_to_retrieve {
            pairs.push(("attributesToRetrieve".to_string(), attributes.join(",")));
        }
        pairs
    }
}
