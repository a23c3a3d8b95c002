use axum::{
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Json,
};
use csv::ReaderBuilder;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::MeiliError;
use crate::store::Document;
use crate::AppState;

type Reply = Result<(StatusCode, Json<Value>), MeiliError>;

fn ok(value: Value) -> Reply {
    Ok((StatusCode::OK, Json(value)))
}

fn accepted(value: Value) -> Reply {
    Ok((StatusCode::ACCEPTED, Json(value)))
}

fn parse_json(body: &str) -> Result<Value, MeiliError> {
    serde_json::from_str(body).map_err(|e| MeiliError::malformed_payload(format!("Invalid JSON: {e}")))
}

fn parse_object(body: &str) -> Result<Map<String, Value>, MeiliError> {
    match parse_json(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(MeiliError::malformed_payload("Expected a JSON object.")),
    }
}

/// Decode a documents payload according to its content type.
fn parse_documents(content_type: &str, body: &str) -> Result<Vec<Document>, MeiliError> {
    if content_type.starts_with("text/csv") {
        return parse_csv(body);
    }
    if content_type.starts_with("application/x-ndjson") {
        return body
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| match parse_json(line)? {
                Value::Object(map) => Ok(map),
                _ => Err(MeiliError::malformed_payload("Each NDJSON line must be an object.")),
            })
            .collect();
    }
    match parse_json(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                _ => Err(MeiliError::malformed_payload("Documents must be JSON objects.")),
            })
            .collect(),
        _ => Err(MeiliError::malformed_payload("Expected an array of documents.")),
    }
}

/// Header row of field names, optionally typed as `name:number`.
fn parse_csv(body: &str) -> Result<Vec<Document>, MeiliError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());
    let header: Vec<(String, bool)> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|column| match column.trim().split_once(':') {
            Some((name, kind)) => (name.to_string(), kind == "number"),
            None => (column.trim().to_string(), false),
        })
        .collect();
    if header.iter().all(|(name, _)| name.is_empty()) {
        return Err(MeiliError::malformed_payload("CSV payload has no header."));
    }

    reader
        .records()
        .map(|record| {
            let record = record.map_err(csv_error)?;
            let document: Document = header
                .iter()
                .zip(record.iter())
                .map(|((name, numeric), cell)| (name.clone(), csv_value(cell.trim(), *numeric)))
                .collect();
            Ok(document)
        })
        .collect()
}

fn csv_error(err: csv::Error) -> MeiliError {
    MeiliError::malformed_payload(format!("Invalid CSV: {err}"))
}

fn csv_value(cell: &str, numeric: bool) -> Value {
    if numeric {
        if let Ok(n) = cell.parse::<i64>() {
            return Value::from(n);
        }
        if let Ok(n) = cell.parse::<f64>() {
            return json!(n);
        }
    }
    Value::String(cell.to_string())
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "available" }))
}

pub async fn version() -> Json<Value> {
    Json(json!({
        "commitSha": "mock",
        "commitDate": "2021-11-11T00:00:00Z",
        "pkgVersion": "0.24.0",
    }))
}

pub async fn keys(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "private": &*state.private_key, "public": &*state.public_key }))
}

pub async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.read().await.stats())
}

pub async fn create_dump(State(state): State<AppState>) -> Reply {
    accepted(state.store.write().await.create_dump())
}

pub async fn dump_status(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.dump_status(&uid)?)
}

pub async fn list_indexes(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.read().await.list_indexes())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexBody {
    uid: Option<String>,
    primary_key: Option<String>,
}

pub async fn create_index(State(state): State<AppState>, body: String) -> Reply {
    let body: IndexBody = serde_json::from_value(Value::Object(parse_object(&body)?))
        .map_err(|e| MeiliError::bad_request(e.to_string()))?;
    let uid = body
        .uid
        .ok_or_else(|| MeiliError::bad_request("Missing `uid` field."))?;
    debug!(%uid, "creating index");
    let info = state.store.write().await.create_index(&uid, body.primary_key)?;
    Ok((StatusCode::CREATED, Json(info)))
}

pub async fn get_index(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.index_info(&uid)?)
}

pub async fn update_index(State(state): State<AppState>, Path(uid): Path<String>, body: String) -> Reply {
    let body: IndexBody = serde_json::from_value(Value::Object(parse_object(&body)?))
        .map_err(|e| MeiliError::bad_request(e.to_string()))?;
    ok(state.store.write().await.update_index(&uid, body.primary_key)?)
}

pub async fn delete_index(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode, MeiliError> {
    state.store.write().await.delete_index(&uid)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn index_stats(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.index_stats(&uid)?)
}

pub async fn list_updates(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.updates(&uid)?)
}

pub async fn get_update(State(state): State<AppState>, Path((uid, update_id)): Path<(String, usize)>) -> Reply {
    ok(state.store.read().await.update(&uid, update_id)?)
}

pub async fn search(State(state): State<AppState>, Path(uid): Path<String>, body: String) -> Reply {
    let params = if body.trim().is_empty() {
        Map::new()
    } else {
        parse_object(&body)?
    };
    ok(state.store.read().await.search(&uid, &params)?)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsParams {
    offset: Option<usize>,
    limit: Option<usize>,
    attributes_to_retrieve: Option<String>,
    primary_key: Option<String>,
}

pub async fn get_documents(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<DocumentsParams>,
) -> Reply {
    let attributes = params
        .attributes_to_retrieve
        .map(|a| a.split(',').map(|f| f.trim().to_string()).collect());
    ok(state
        .store
        .read()
        .await
        .get_documents(&uid, params.offset, params.limit, attributes)?)
}

async fn write_documents(
    state: AppState,
    uid: String,
    params: DocumentsParams,
    headers: HeaderMap,
    body: String,
    merge: bool,
) -> Reply {
    let documents = parse_documents(content_type(&headers), &body)?;
    debug!(%uid, count = documents.len(), merge, "writing documents");
    accepted(
        state
            .store
            .write()
            .await
            .add_documents(&uid, documents, params.primary_key, merge)?,
    )
}

pub async fn add_documents(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<DocumentsParams>,
    headers: HeaderMap,
    body: String,
) -> Reply {
    write_documents(state, uid, params, headers, body, false).await
}

pub async fn update_documents(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Query(params): Query<DocumentsParams>,
    headers: HeaderMap,
    body: String,
) -> Reply {
    write_documents(state, uid, params, headers, body, true).await
}

pub async fn clear_documents(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    accepted(state.store.write().await.clear_documents(&uid)?)
}

pub async fn get_document(State(state): State<AppState>, Path((uid, id)): Path<(String, String)>) -> Reply {
    ok(state.store.read().await.get_document(&uid, &id)?)
}

pub async fn delete_document(State(state): State<AppState>, Path((uid, id)): Path<(String, String)>) -> Reply {
    accepted(state.store.write().await.delete_document(&uid, &id)?)
}

pub async fn delete_documents(State(state): State<AppState>, Path(uid): Path<String>, body: String) -> Reply {
    let ids = match parse_json(&body)? {
        Value::Array(ids) => ids,
        _ => return Err(MeiliError::malformed_payload("Expected an array of document ids.")),
    };
    accepted(state.store.write().await.delete_documents(&uid, &ids)?)
}

pub async fn get_settings(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.settings(&uid)?)
}

pub async fn update_settings(State(state): State<AppState>, Path(uid): Path<String>, body: String) -> Reply {
    let body = parse_object(&body)?;
    accepted(state.store.write().await.update_settings(&uid, body)?)
}

pub async fn reset_settings(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    accepted(state.store.write().await.reset_settings(&uid)?)
}

pub async fn get_setting(State(state): State<AppState>, Path((uid, name)): Path<(String, String)>) -> Reply {
    ok(state.store.read().await.setting(&uid, &name)?)
}

pub async fn update_setting(
    State(state): State<AppState>,
    Path((uid, name)): Path<(String, String)>,
    body: String,
) -> Reply {
    let value = parse_json(&body)?;
    accepted(state.store.write().await.update_setting(&uid, &name, value)?)
}

pub async fn reset_setting(State(state): State<AppState>, Path((uid, name)): Path<(String, String)>) -> Reply {
    accepted(state.store.write().await.reset_setting(&uid, &name)?)
}

pub async fn list_tasks(State(state): State<AppState>) -> Reply {
    ok(state.store.read().await.tasks(None)?)
}

pub async fn get_task(State(state): State<AppState>, Path(task_uid): Path<usize>) -> Reply {
    ok(state.store.read().await.task(task_uid, None)?)
}

pub async fn list_index_tasks(State(state): State<AppState>, Path(uid): Path<String>) -> Reply {
    ok(state.store.read().await.tasks(Some(&uid))?)
}

pub async fn get_index_task(
    State(state): State<AppState>,
    Path((uid, task_uid)): Path<(String, usize)>,
) -> Reply {
    ok(state.store.read().await.task(task_uid, Some(&uid))?)
}
