use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// An error in the shape MeiliSearch answers with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct MeiliError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error_type: &'static str,
    pub message: String,
}

impl MeiliError {
    fn new(status: StatusCode, code: &'static str, error_type: &'static str, message: String) -> Self {
        Self {
            status,
            code,
            error_type,
            message,
        }
    }

    fn invalid_request(status: StatusCode, code: &'static str, message: String) -> Self {
        Self::new(status, code, "invalid_request_error", message)
    }

    pub fn index_not_found(uid: &str) -> Self {
        Self::invalid_request(StatusCode::NOT_FOUND, "index_not_found", format!("Index {uid} not found."))
    }

    pub fn index_already_exists(uid: &str) -> Self {
        Self::invalid_request(
            StatusCode::CONFLICT,
            "index_already_exists",
            format!("Index {uid} already exists."),
        )
    }

    pub fn invalid_index_uid(uid: &str) -> Self {
        Self::invalid_request(
            StatusCode::BAD_REQUEST,
            "invalid_index_uid",
            format!(
                "`{uid}` is not a valid index uid. Index uid can be an integer or a string containing only alphanumeric characters, hyphens (-) and underscores (_)."
            ),
        )
    }

    pub fn document_not_found(id: &str) -> Self {
        Self::invalid_request(
            StatusCode::NOT_FOUND,
            "document_not_found",
            format!("Document {id} not found."),
        )
    }

    pub fn primary_key_already_present() -> Self {
        Self::invalid_request(
            StatusCode::BAD_REQUEST,
            "primary_key_already_present",
            "The primary key cannot be changed once documents are indexed.".to_string(),
        )
    }

    pub fn missing_primary_key() -> Self {
        Self::invalid_request(
            StatusCode::BAD_REQUEST,
            "missing_primary_key",
            "The primary key inference process failed because no field contains `id`.".to_string(),
        )
    }

    pub fn missing_document_id(primary_key: &str) -> Self {
        Self::invalid_request(
            StatusCode::BAD_REQUEST,
            "missing_document_id",
            format!("A document is missing a valid `{primary_key}` field."),
        )
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self::invalid_request(StatusCode::BAD_REQUEST, "malformed_payload", message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::invalid_request(StatusCode::BAD_REQUEST, "bad_request", message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::invalid_request(StatusCode::NOT_FOUND, "not_found", message.into())
    }

    pub fn missing_authorization_header() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "missing_authorization_header",
            "auth",
            "You must have an authorization token.".to_string(),
        )
    }

    pub fn invalid_api_key() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "invalid_api_key",
            "auth",
            "The provided API key is invalid.".to_string(),
        )
    }

    pub fn to_json(&self) -> Value {
        json!({
            "message": self.message,
            "code": self.code,
            "type": self.error_type,
            "link": format!("https://docs.meilisearch.com/errors#{}", self.code),
        })
    }
}

impl IntoResponse for MeiliError {
    fn into_response(self) -> Response {
        (self.status, Json(self.to_json())).into_response()
    }
}
