//! In-memory model of the MeiliSearch objects the client touches.
//!
//! Writes are applied synchronously but still answered the way MeiliSearch
//! answers them: with an `updateId`, and a matching update (per index) and
//! task (global) whose status is already final.

use std::collections::{BTreeMap, HashMap};

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::MeiliError;

pub type Document = Map<String, Value>;

const DEFAULT_SEARCH_LIMIT: usize = 20;
const DEFAULT_DOCUMENTS_LIMIT: usize = 20;

/// Settings and their defaults, keyed by body field name.
fn default_settings() -> Map<String, Value> {
    let defaults = json!({
        "rankingRules": ["words", "typo", "proximity", "attribute", "sort", "exactness"],
        "distinctAttribute": null,
        "searchableAttributes": ["*"],
        "displayedAttributes": ["*"],
        "stopWords": [],
        "synonyms": {},
        "filterableAttributes": [],
        "sortableAttributes": [],
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `ranking-rules` -> `rankingRules`.
pub fn setting_field(route_name: &str) -> String {
    let mut field = String::with_capacity(route_name.len());
    let mut upper = false;
    for c in route_name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            field.extend(c.to_uppercase());
            upper = false;
        } else {
            field.push(c);
        }
    }
    field
}

fn validate_setting(field: &str, value: &Value) -> Result<(), MeiliError> {
    let valid = match field {
        _ if value.is_null() => true,
        "distinctAttribute" => value.is_string(),
        "synonyms" => value.as_object().is_some_and(|map| {
            map.values()
                .all(|v| v.as_array().is_some_and(|a| a.iter().all(Value::is_string)))
        }),
        "rankingRules" | "searchableAttributes" | "displayedAttributes" | "stopWords"
        | "filterableAttributes" | "sortableAttributes" => value
            .as_array()
            .is_some_and(|a| a.iter().all(Value::is_string)),
        _ => return Err(MeiliError::bad_request(format!("Unknown setting `{field}`."))),
    };
    if valid {
        Ok(())
    } else {
        Err(MeiliError::bad_request(format!("Invalid value for setting `{field}`.")))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn valid_index_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// The string key of a document id, if the value is a usable id.
fn document_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if valid_index_uid(s) => Some(s.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn infer_primary_key(document: &Document) -> Option<String> {
    document
        .keys()
        .find(|key| key.to_lowercase().contains("id"))
        .cloned()
}

#[derive(Debug)]
struct IndexState {
    uid: String,
    primary_key: Option<String>,
    created_at: String,
    updated_at: String,
    documents: BTreeMap<String, Document>,
    settings: Map<String, Value>,
    updates: Vec<Value>,
}

impl IndexState {
    fn new(uid: &str, primary_key: Option<String>) -> Self {
        let created_at = now();
        Self {
            uid: uid.to_string(),
            primary_key,
            updated_at: created_at.clone(),
            created_at,
            documents: BTreeMap::new(),
            settings: default_settings(),
            updates: Vec::new(),
        }
    }

    fn info(&self) -> Value {
        json!({
            "uid": self.uid,
            "name": self.uid,
            "primaryKey": self.primary_key,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }

    fn touch(&mut self) {
        self.updated_at = now();
    }

    fn string_list(&self, field: &str) -> Option<Vec<String>> {
        let list: Vec<String> = self
            .settings
            .get(field)?
            .as_array()?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        if list.iter().any(|a| a == "*") {
            None
        } else {
            Some(list)
        }
    }

    fn field_distribution(&self) -> Map<String, Value> {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for document in self.documents.values() {
            for field in document.keys() {
                *counts.entry(field.as_str()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .map(|(field, count)| (field.to_string(), json!(count)))
            .collect()
    }

    fn stats(&self) -> Value {
        json!({
            "numberOfDocuments": self.documents.len(),
            "isIndexing": false,
            "fieldDistribution": self.field_distribution(),
        })
    }

    fn add_documents(
        &mut self,
        documents: Vec<Document>,
        primary_key: Option<String>,
        merge: bool,
    ) -> Result<(), MeiliError> {
        let primary_key = match (&self.primary_key, primary_key) {
            (Some(existing), _) => existing.clone(),
            (None, Some(requested)) => requested,
            (None, None) => documents
                .first()
                .and_then(infer_primary_key)
                .ok_or_else(MeiliError::missing_primary_key)?,
        };

        let mut keyed = Vec::with_capacity(documents.len());
        for document in documents {
            let key = document
                .get(&primary_key)
                .and_then(document_key)
                .ok_or_else(|| MeiliError::missing_document_id(&primary_key))?;
            keyed.push((key, document));
        }

        self.primary_key = Some(primary_key);
        for (key, document) in keyed {
            if merge {
                if let Some(existing) = self.documents.get_mut(&key) {
                    existing.extend(document);
                    continue;
                }
            }
            self.documents.insert(key, document);
        }
        Ok(())
    }

    fn project(&self, document: &Document, attributes: Option<&[String]>) -> Value {
        let displayed = self.string_list("displayedAttributes");
        let keep = |field: &str| {
            attributes.map_or(true, |a| a.iter().any(|f| f == "*" || f == field))
                && displayed.as_ref().map_or(true, |d| d.iter().any(|f| f == field))
        };
        Value::Object(
            document
                .iter()
                .filter(|(field, _)| keep(field.as_str()))
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
        )
    }

    fn matches(&self, document: &Document, words: &[String]) -> bool {
        let searchable = self.string_list("searchableAttributes");
        let haystack: Vec<String> = document
            .iter()
            .filter(|(field, _)| {
                searchable
                    .as_ref()
                    .map_or(true, |s| s.iter().any(|f| f == *field))
            })
            .filter_map(|(_, value)| match value {
                Value::String(s) => Some(s.to_lowercase()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect();
        words
            .iter()
            .all(|word| haystack.iter().any(|text| text.contains(word.as_str())))
    }
}

/// Everything the mock server knows.
#[derive(Debug, Default)]
pub struct Store {
    indexes: BTreeMap<String, IndexState>,
    tasks: Vec<Value>,
    dumps: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, uid: &str) -> Result<&IndexState, MeiliError> {
        self.indexes
            .get(uid)
            .ok_or_else(|| MeiliError::index_not_found(uid))
    }

    fn index_mut(&mut self, uid: &str) -> Result<&mut IndexState, MeiliError> {
        self.indexes
            .get_mut(uid)
            .ok_or_else(|| MeiliError::index_not_found(uid))
    }

    /// Writes to documents or settings create the index on the fly.
    fn ensure_index(&mut self, uid: &str) -> Result<&mut IndexState, MeiliError> {
        if !valid_index_uid(uid) {
            return Err(MeiliError::invalid_index_uid(uid));
        }
        Ok(self
            .indexes
            .entry(uid.to_string())
            .or_insert_with(|| IndexState::new(uid, None)))
    }

    /// Log an update on `uid` and the matching global task.
    fn record(
        &mut self,
        uid: &str,
        kind: &str,
        number: Option<usize>,
        outcome: Result<(), MeiliError>,
    ) -> Value {
        let task_uid = self.tasks.len();
        let Some(index) = self.indexes.get_mut(uid) else {
            return json!({ "updateId": Value::Null });
        };
        let update_id = index.updates.len();
        let timestamp = now();

        let mut update_type = json!({ "name": kind });
        if let Some(number) = number {
            update_type["number"] = json!(number);
        }
        let mut update = json!({
            "updateId": update_id,
            "type": update_type,
            "duration": 0.0,
            "enqueuedAt": timestamp,
            "processedAt": timestamp,
        });
        let mut task = json!({
            "uid": task_uid,
            "indexUid": uid,
            "type": kind,
            "enqueuedAt": timestamp,
            "finishedAt": timestamp,
        });
        match outcome {
            Ok(()) => {
                update["status"] = json!("processed");
                task["status"] = json!("succeeded");
                index.touch();
            }
            Err(err) => {
                update["status"] = json!("failed");
                task["status"] = json!("failed");
                task["error"] = err.to_json();
                if let (Value::Object(update), Value::Object(error)) = (&mut update, err.to_json()) {
                    update.extend(error);
                }
            }
        }

        index.updates.push(update);
        self.tasks.push(task);
        json!({ "updateId": update_id })
    }

    pub fn create_index(&mut self, uid: &str, primary_key: Option<String>) -> Result<Value, MeiliError> {
        if !valid_index_uid(uid) {
            return Err(MeiliError::invalid_index_uid(uid));
        }
        if self.indexes.contains_key(uid) {
            return Err(MeiliError::index_already_exists(uid));
        }
        let index = IndexState::new(uid, primary_key);
        let info = index.info();
        self.indexes.insert(uid.to_string(), index);
        Ok(info)
    }

    pub fn index_info(&self, uid: &str) -> Result<Value, MeiliError> {
        self.index(uid).map(IndexState::info)
    }

    pub fn list_indexes(&self) -> Value {
        Value::Array(self.indexes.values().map(IndexState::info).collect())
    }

    pub fn update_index(&mut self, uid: &str, primary_key: Option<String>) -> Result<Value, MeiliError> {
        let index = self.index_mut(uid)?;
        if let Some(primary_key) = primary_key {
            if index.primary_key.as_deref() != Some(primary_key.as_str()) {
                if !index.documents.is_empty() {
                    return Err(MeiliError::primary_key_already_present());
                }
                index.primary_key = Some(primary_key);
            }
        }
        index.touch();
        Ok(index.info())
    }

    pub fn delete_index(&mut self, uid: &str) -> Result<(), MeiliError> {
        self.indexes
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| MeiliError::index_not_found(uid))
    }

    /// Add (`merge == false`) or partially update (`merge == true`) documents.
    pub fn add_documents(
        &mut self,
        uid: &str,
        documents: Vec<Document>,
        primary_key: Option<String>,
        merge: bool,
    ) -> Result<Value, MeiliError> {
        let count = documents.len();
        let outcome = self.ensure_index(uid)?.add_documents(documents, primary_key, merge);
        let kind = if merge {
            "DocumentsPartial"
        } else {
            "DocumentsAddition"
        };
        Ok(self.record(uid, kind, Some(count), outcome))
    }

    pub fn get_document(&self, uid: &str, id: &str) -> Result<Value, MeiliError> {
        let index = self.index(uid)?;
        let document = index
            .documents
            .get(id)
            .ok_or_else(|| MeiliError::document_not_found(id))?;
        Ok(index.project(document, None))
    }

    pub fn get_documents(
        &self,
        uid: &str,
        offset: Option<usize>,
        limit: Option<usize>,
        attributes: Option<Vec<String>>,
    ) -> Result<Value, MeiliError> {
        let index = self.index(uid)?;
        Ok(Value::Array(
            index
                .documents
                .values()
                .skip(offset.unwrap_or(0))
                .take(limit.unwrap_or(DEFAULT_DOCUMENTS_LIMIT))
                .map(|document| index.project(document, attributes.as_deref()))
                .collect(),
        ))
    }

    pub fn delete_document(&mut self, uid: &str, id: &str) -> Result<Value, MeiliError> {
        let removed = usize::from(self.index_mut(uid)?.documents.remove(id).is_some());
        Ok(self.record(uid, "DocumentsDeletion", Some(removed), Ok(())))
    }

    pub fn delete_documents(&mut self, uid: &str, ids: &[Value]) -> Result<Value, MeiliError> {
        let index = self.index_mut(uid)?;
        let removed = ids
            .iter()
            .filter_map(document_key)
            .filter(|key| index.documents.remove(key).is_some())
            .count();
        Ok(self.record(uid, "DocumentsDeletion", Some(removed), Ok(())))
    }

    pub fn clear_documents(&mut self, uid: &str) -> Result<Value, MeiliError> {
        self.index_mut(uid)?.documents.clear();
        Ok(self.record(uid, "ClearAll", None, Ok(())))
    }

    /// Case-insensitive substring match of every query word against the
    /// searchable fields, in primary-key order.
    pub fn search(&self, uid: &str, params: &Map<String, Value>) -> Result<Value, MeiliError> {
        let index = self.index(uid)?;
        let query = params.get("q").and_then(Value::as_str).unwrap_or_default();
        let offset = params.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let limit = params
            .get("limit")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SEARCH_LIMIT, |l| l as usize);
        let attributes: Option<Vec<String>> = params
            .get("attributesToRetrieve")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());

        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let matching: Vec<&Document> = index
            .documents
            .values()
            .filter(|document| index.matches(document, &words))
            .collect();
        let hits: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(limit)
            .map(|document| index.project(document, attributes.as_deref()))
            .collect();

        Ok(json!({
            "hits": hits,
            "offset": offset,
            "limit": limit,
            "nbHits": matching.len(),
            "exhaustiveNbHits": false,
            "processingTimeMs": 0,
            "query": query,
        }))
    }

    pub fn settings(&self, uid: &str) -> Result<Value, MeiliError> {
        Ok(Value::Object(self.index(uid)?.settings.clone()))
    }

    pub fn setting(&self, uid: &str, route_name: &str) -> Result<Value, MeiliError> {
        let field = setting_field(route_name);
        self.index(uid)?
            .settings
            .get(&field)
            .cloned()
            .ok_or_else(|| MeiliError::not_found(format!("Unknown setting `{route_name}`.")))
    }

    /// `null` values reset the field to its default.
    pub fn update_settings(&mut self, uid: &str, body: Map<String, Value>) -> Result<Value, MeiliError> {
        for (field, value) in &body {
            validate_setting(field, value)?;
        }
        let defaults = default_settings();
        let index = self.ensure_index(uid)?;
        for (field, value) in body {
            let value = if value.is_null() {
                defaults.get(&field).cloned().unwrap_or(Value::Null)
            } else {
                value
            };
            index.settings.insert(field, value);
        }
        Ok(self.record(uid, "Settings", None, Ok(())))
    }

    pub fn update_setting(&mut self, uid: &str, route_name: &str, value: Value) -> Result<Value, MeiliError> {
        let field = setting_field(route_name);
        if !default_settings().contains_key(&field) {
            return Err(MeiliError::not_found(format!("Unknown setting `{route_name}`.")));
        }
        let mut body = Map::new();
        body.insert(field, value);
        self.update_settings(uid, body)
    }

    pub fn reset_settings(&mut self, uid: &str) -> Result<Value, MeiliError> {
        self.index_mut(uid)?.settings = default_settings();
        Ok(self.record(uid, "Settings", None, Ok(())))
    }

    pub fn reset_setting(&mut self, uid: &str, route_name: &str) -> Result<Value, MeiliError> {
        self.index(uid)?;
        self.update_setting(uid, route_name, Value::Null)
    }

    pub fn updates(&self, uid: &str) -> Result<Value, MeiliError> {
        Ok(Value::Array(self.index(uid)?.updates.clone()))
    }

    pub fn update(&self, uid: &str, update_id: usize) -> Result<Value, MeiliError> {
        self.index(uid)?
            .updates
            .get(update_id)
            .cloned()
            .ok_or_else(|| MeiliError::not_found(format!("Update {update_id} not found.")))
    }

    pub fn index_stats(&self, uid: &str) -> Result<Value, MeiliError> {
        self.index(uid).map(IndexState::stats)
    }

    pub fn stats(&self) -> Value {
        let indexes: Map<String, Value> = self
            .indexes
            .iter()
            .map(|(uid, index)| (uid.clone(), index.stats()))
            .collect();
        let last_update = self
            .indexes
            .values()
            .map(|index| index.updated_at.as_str())
            .max();
        json!({
            "databaseSize": 0,
            "lastUpdate": last_update,
            "indexes": indexes,
        })
    }

    pub fn tasks(&self, index_uid: Option<&str>) -> Result<Value, MeiliError> {
        if let Some(uid) = index_uid {
            self.index(uid)?;
        }
        let results: Vec<Value> = self
            .tasks
            .iter()
            .filter(|task| index_uid.map_or(true, |uid| task["indexUid"] == uid))
            .cloned()
            .collect();
        Ok(json!({ "results": results }))
    }

    pub fn task(&self, task_uid: usize, index_uid: Option<&str>) -> Result<Value, MeiliError> {
        if let Some(uid) = index_uid {
            self.index(uid)?;
        }
        self.tasks
            .get(task_uid)
            .filter(|task| index_uid.map_or(true, |uid| task["indexUid"] == uid))
            .cloned()
            .ok_or_else(|| MeiliError::not_found(format!("Task {task_uid} not found.")))
    }

    /// Dumps finish instantly; the creation answer still says `in_progress`.
    pub fn create_dump(&mut self) -> Value {
        let uid = Uuid::new_v4().to_string();
        self.dumps
            .insert(uid.clone(), json!({ "uid": uid, "status": "done" }));
        json!({ "uid": uid, "status": "in_progress" })
    }

    pub fn dump_status(&self, uid: &str) -> Result<Value, MeiliError> {
        self.dumps
            .get(uid)
            .cloned()
            .ok_or_else(|| MeiliError::not_found(format!("Dump {uid} not found.")))
    }
}
