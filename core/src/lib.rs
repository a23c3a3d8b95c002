//! Asynchronous client for the MeiliSearch REST API.
//!
//! # Overview
//! Every call becomes one HTTP request against a MeiliSearch server; the
//! answer comes back as the `serde_json::Value` the server sent. Ranking,
//! indexing and storage all happen server-side.
//!
//! # Design
//! - `Transport` owns one connection pool with an explicit open/close
//!   lifecycle. Requests after `close` fail with `Error::Closed`.
//! - `Client` and `Index` are thin handles that share the transport through
//!   an `Arc` and build plain-data `HttpRequest` values for it.
//! - Non-2xx answers become `Error::Api` with the status code and the
//!   server's error object; network failures become `Error::Communication`.
//!
//! ```no_run
//! # async fn demo() -> meili_async::Result<()> {
//! let client = meili_async::Client::new("http://localhost:7700", Some("masterKey"), None);
//! let movies = client.index("movies");
//! let update = movies
//!     .add_documents(&[serde_json::json!({"id": 1, "title": "Carol"})], None)
//!     .await?;
//! println!("{update}");
//! client.close();
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod index;
pub mod task;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use index::Index;
pub use transport::Transport;
pub use types::{DocumentsQuery, IndexInfo, IndexOptions};
