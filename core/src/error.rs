//! Error types for the MeiliSearch client.
//!
//! # Design
//! Every failure a call can produce is one `Error` variant and is returned to
//! the caller untouched; nothing here retries. A non-2xx answer from the
//! server is always `Error::Api`, which keeps the status code next to
//! whatever the server said about the failure.

use serde::Deserialize;
use std::fmt;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by the transport and every handle method.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The request never got an answer: DNS, connect, TLS or I/O failure.
    #[error("communication error: {0}")]
    Communication(String),

    /// The request or a polling wait ran past its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The transport was closed before this request was issued.
    #[error("transport is closed")]
    Closed,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A 2xx response body was not valid JSON, or not the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Translate a `reqwest` failure into the client taxonomy.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() {
            Error::Deserialization(err.to_string())
        } else {
            Error::Communication(err.to_string())
        }
    }

    /// The MeiliSearch error code, when the server sent one.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Error::Api(err) => err.code.as_deref(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(err) => Some(err.status),
            _ => None,
        }
    }
}

/// A non-2xx response from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub code: Option<String>,
    pub link: Option<String>,
    pub error_type: Option<String>,
}

/// Error body shape documented at https://docs.meilisearch.com/errors.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
    link: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl ApiError {
    /// Build from a status and raw body. Bodies that are not MeiliSearch error
    /// objects are kept verbatim as the message.
    pub fn from_response(status: u16, body: &str) -> Self {
        let fallback = || {
            if body.trim().is_empty() {
                reason_phrase(status)
            } else {
                body.to_string()
            }
        };
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self {
                status,
                message: parsed.message.unwrap_or_else(fallback),
                code: parsed.code,
                link: parsed.link,
                error_type: parsed.error_type,
            },
            Err(_) => Self {
                status,
                message: fallback(),
                code: None,
                link: None,
                error_type: None,
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {code}")?;
            if let Some(error_type) = &self.error_type {
                write!(f, ", type: {error_type}")?;
            }
            if let Some(link) = &self.link {
                write!(f, ", see {link}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

fn reason_phrase(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("status {status}"))
}
