//! End-to-end tests against the in-memory mock server.
//!
//! Each test starts its own mock server on a random port, so tests are
//! independent and can run in parallel.

use std::collections::HashMap;
use std::time::Duration;

use meili_async::{Client, DocumentsQuery, Error, IndexOptions};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn client() -> Client {
    let url = mock_server::spawn(mock_server::app()).await.unwrap();
    Client::new(&url, None, None)
}

fn movies() -> Vec<Value> {
    vec![
        json!({"id": 123, "title": "Pride and Prejudice", "genre": "romance"}),
        json!({"id": 456, "title": "Le Petit Prince", "genre": "adventure"}),
        json!({"id": 1, "title": "Alice In Wonderland", "genre": "adventure"}),
        json!({"id": 1344, "title": "The Hobbit", "genre": "adventure"}),
        json!({"id": 4, "title": "Harry Potter and the Half-Blood Prince", "genre": "fantasy"}),
        json!({"id": 42, "title": "The Hitchhiker's Guide to the Galaxy", "genre": "fantasy"}),
    ]
}

fn update_id(update: &Value) -> u64 {
    update["updateId"].as_u64().unwrap()
}

// ---------------------------------------------------------------------------
// Transport behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn adding_six_movies_returns_first_update_id() {
    let client = client().await;
    let update = client.index("movies").add_documents(&movies(), None).await.unwrap();
    assert_eq!(update, json!({"updateId": 0}));
}

#[tokio::test]
async fn nonexistent_index_is_404() {
    let client = client().await;
    let err = client.get_index("nonexistent").await.unwrap_err();
    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 404);
            assert_eq!(api.code.as_deref(), Some("index_not_found"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn successful_calls_return_server_json_unmodified() {
    let client = client().await;
    assert_eq!(client.health().await.unwrap(), json!({"status": "available"}));
    assert_eq!(
        client.version().await.unwrap(),
        json!({"commitSha": "mock", "commitDate": "2021-11-11T00:00:00Z", "pkgVersion": "0.24.0"})
    );
    assert_eq!(client.get_version().await.unwrap(), client.version().await.unwrap());
}

#[tokio::test]
async fn requests_after_close_fail() {
    let client = client().await;
    client.open().unwrap();
    assert!(client.is_healthy().await);

    let index = client.index("movies");
    client.close();

    assert!(client.is_closed());
    assert!(matches!(client.health().await, Err(Error::Closed)));
    assert!(matches!(client.get_indexes().await, Err(Error::Closed)));
    assert!(matches!(index.get_documents(None).await, Err(Error::Closed)));
    assert!(matches!(
        index.add_documents(&movies(), None).await,
        Err(Error::Closed)
    ));
    assert!(matches!(client.open(), Err(Error::Closed)));
}

#[tokio::test]
async fn concurrent_requests_share_one_session() {
    let client = client().await;
    let index = client.index("movies");
    index.add_documents(&movies(), None).await.unwrap();

    let (a, b, c) = tokio::join!(
        index.get_document(123),
        index.get_document(456),
        client.get_all_stats()
    );
    assert_eq!(a.unwrap()["title"], "Pride and Prejudice");
    assert_eq!(b.unwrap()["title"], "Le Petit Prince");
    assert_eq!(c.unwrap()["indexes"]["movies"]["numberOfDocuments"], 6);
}

#[tokio::test]
async fn refused_connection_is_a_communication_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new(&format!("http://{addr}"), None, None);
    assert!(matches!(client.health().await, Err(Error::Communication(_))));
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn stalled_server_hits_the_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let client = Client::new(&format!("http://{addr}"), None, Some(Duration::from_millis(200)));
    assert!(matches!(client.health().await, Err(Error::Timeout(_))));
}

/// Serve raw HTTP/1.1: `GET /health` answers 308 and
/// `POST /indexes/movies/documents` answers 302, both pointing at `/landing`,
/// which answers 200.
async fn redirecting_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                let head_end = loop {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        return;
                    }
                    raw.extend_from_slice(&buf[..n]);
                    if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                };
                let head = String::from_utf8_lossy(&raw[..head_end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while raw.len() < head_end + content_length {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }

                let status = if head.starts_with("get /health ") {
                    "308 Permanent Redirect"
                } else if head.starts_with("post /indexes/movies/documents") {
                    "302 Found"
                } else {
                    "200 OK"
                };
                let body = r#"{"landed":true}"#;
                let response = format!(
                    "HTTP/1.1 {status}\r\nlocation: /landing\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn redirects_surface_as_api_errors() {
    let client = Client::new(&redirecting_server().await, None, None);

    let err = client.health().await.unwrap_err();
    assert!(matches!(err, Error::Api(_)), "got {err:?}");
    assert_eq!(err.status(), Some(308));

    let err = client
        .index("movies")
        .add_documents(&movies(), None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(302));
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let url = mock_server::spawn(mock_server::app_with_master_key("masterKey"))
        .await
        .unwrap();

    let authorized = Client::new(&url, Some("masterKey"), None);
    assert_eq!(authorized.get_raw_indexes().await.unwrap(), json!([]));
    let keys = authorized.get_keys().await.unwrap();
    assert!(keys["private"].is_string());
    assert!(keys["public"].is_string());

    let wrong = Client::new(&url, Some("nope"), None);
    assert_eq!(wrong.get_raw_indexes().await.unwrap_err().status(), Some(403));

    let anonymous = Client::new(&url, None, None);
    let err = anonymous.get_keys().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.api_code(), Some("missing_authorization_header"));
    assert!(anonymous.is_healthy().await);
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn index_lifecycle() {
    let client = client().await;

    let books = client
        .create_index("books", Some(&IndexOptions::primary_key("book_id")))
        .await
        .unwrap();
    assert_eq!(books.uid, "books");
    assert_eq!(books.primary_key.as_deref(), Some("book_id"));

    let err = client.create_index("books", None).await.unwrap_err();
    assert_eq!(err.status(), Some(409));

    client.create_index("movies", None).await.unwrap();
    let indexes = client.get_indexes().await.unwrap();
    let uids: Vec<&str> = indexes.iter().map(|i| i.uid.as_str()).collect();
    assert_eq!(uids, vec!["books", "movies"]);
    assert!(indexes[0].created_at.is_some());

    let raw = client.get_raw_index("books").await.unwrap();
    assert_eq!(raw["primaryKey"], "book_id");

    let mut movies = client.get_index("movies").await.unwrap();
    assert_eq!(movies.primary_key, None);
    movies.update("movie_id").await.unwrap();
    assert_eq!(movies.primary_key.as_deref(), Some("movie_id"));
    assert_eq!(movies.get_primary_key().await.unwrap().as_deref(), Some("movie_id"));

    assert!(client.delete_index_if_exists("books").await.unwrap());
    assert!(!client.delete_index_if_exists("books").await.unwrap());
    assert_eq!(movies.delete().await.unwrap(), Value::Null);
    assert!(!movies.delete_if_exists().await.unwrap());
    assert!(client.get_indexes().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_or_create_index_creates_once() {
    let client = client().await;
    let created = client
        .get_or_create_index("songs", Some(&IndexOptions::primary_key("code")))
        .await
        .unwrap();
    assert_eq!(created.primary_key.as_deref(), Some("code"));

    let fetched = client.get_or_create_index("songs", None).await.unwrap();
    assert_eq!(fetched.primary_key.as_deref(), Some("code"));
    assert_eq!(fetched.created_at, created.created_at);
    assert_eq!(client.get_raw_indexes().await.unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_index_uid_is_rejected() {
    let client = client().await;
    let err = client.create_index("not valid", None).await.unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.api_code(), Some("invalid_index_uid"));
}

// ---------------------------------------------------------------------------
// Documents and updates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn documents_round_trip() {
    let client = client().await;
    let index = client.index("movies");

    let update = index.add_documents(&movies(), Some("id")).await.unwrap();
    let status = index
        .wait_for_pending_update(update_id(&update), None, None)
        .await
        .unwrap();
    assert_eq!(status["status"], "processed");

    assert_eq!(
        index.get_document(1344).await.unwrap(),
        json!({"id": 1344, "title": "The Hobbit", "genre": "adventure"})
    );
    let err = index.get_document(999).await.unwrap_err();
    assert_eq!(err.api_code(), Some("document_not_found"));

    let all = index.get_documents(None).await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 6);

    let page = index
        .get_documents(Some(
            &DocumentsQuery::new()
                .with_offset(1)
                .with_limit(2)
                .with_attributes_to_retrieve(["title"]),
        ))
        .await
        .unwrap();
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 2);
    assert!(page
        .iter()
        .all(|d| d.as_object().unwrap().keys().map(String::as_str).eq(["title"])));

    index
        .update_documents(&[json!({"id": 1, "title": "Alice Through the Looking Glass"})], None)
        .await
        .unwrap();
    let alice = index.get_document(1).await.unwrap();
    assert_eq!(alice["title"], "Alice Through the Looking Glass");
    assert_eq!(alice["genre"], "adventure");

    index.delete_document(1).await.unwrap();
    index.delete_documents(&[123, 456]).await.unwrap();
    assert_eq!(index.get_documents(None).await.unwrap().as_array().unwrap().len(), 3);

    let update = index.delete_all_documents().await.unwrap();
    index
        .wait_for_pending_update(update_id(&update), None, None)
        .await
        .unwrap();
    assert_eq!(index.get_documents(None).await.unwrap(), json!([]));

    let updates = index.get_all_update_status().await.unwrap();
    assert_eq!(updates.as_array().unwrap().len(), 5);
    assert_eq!(index.get_update_status(0).await.unwrap()["type"]["name"], "DocumentsAddition");
}

#[tokio::test]
async fn reserved_characters_stay_inside_the_document_id() {
    let client = client().await;
    let index = client.index("movies");
    index.add_documents(&movies(), None).await.unwrap();

    let err = index.get_document("1/../123").await.unwrap_err();
    assert_eq!(err.api_code(), Some("document_not_found"));
    let err = index.get_document("1?x=1").await.unwrap_err();
    assert_eq!(err.api_code(), Some("document_not_found"));
}

#[tokio::test]
async fn batches_produce_one_update_each() {
    let client = client().await;
    let index = client.index("movies");

    let updates = index.add_documents_in_batches(&movies(), 4, None).await.unwrap();
    assert_eq!(updates, vec![json!({"updateId": 0}), json!({"updateId": 1})]);

    let updates = index
        .update_documents_in_batches(&movies()[..3], 1, None)
        .await
        .unwrap();
    assert_eq!(updates.len(), 3);
    assert_eq!(index.get_stats().await.unwrap()["numberOfDocuments"], 6);

    let err = index.add_documents_in_batches(&movies(), 0, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn raw_payloads_keep_their_content_type() {
    let client = client().await;
    let songs = client.index("songs");

    songs
        .add_documents_csv("id:number,title,album\n1,Blue,\"Kind, Vol. 1\"\n2,Red,Kind\n", None)
        .await
        .unwrap();
    songs
        .add_documents_ndjson("{\"id\":3,\"title\":\"Green\"}\n{\"id\":4,\"title\":\"Gold\"}\n", None)
        .await
        .unwrap();
    songs
        .add_documents_json(r#"[{"id":5,"title":"White"}]"#, None)
        .await
        .unwrap();

    assert_eq!(songs.get_document(1).await.unwrap()["title"], "Blue");
    assert_eq!(songs.get_document(1).await.unwrap()["album"], "Kind, Vol. 1");
    assert_eq!(songs.get_document(4).await.unwrap()["title"], "Gold");
    assert_eq!(songs.get_stats().await.unwrap()["numberOfDocuments"], 5);

    let err = songs
        .add_documents_raw("id,title\n6", Some("id"), "text/csv")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn failed_update_is_returned_not_raised() {
    let client = client().await;
    let index = client.index("notes");
    let update = index.add_documents(&[json!({"text": "no identifier"})], None).await.unwrap();

    let status = index
        .wait_for_pending_update(update_id(&update), Some(Duration::from_secs(1)), None)
        .await
        .unwrap();
    assert_eq!(status["status"], "failed");
    assert_eq!(status["code"], "missing_primary_key");
}

#[tokio::test]
async fn unknown_update_is_404() {
    let client = client().await;
    let index = client.create_index("movies", None).await.unwrap();
    let err = index.wait_for_pending_update(7, None, None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_merges_optional_parameters() {
    let client = client().await;
    let index = client.index("movies");
    index.add_documents(&movies(), None).await.unwrap();

    let result = index.search("prince", None).await.unwrap();
    assert_eq!(result["nbHits"], 2);
    assert_eq!(result["query"], "prince");

    let mut params = Map::new();
    params.insert("limit".to_string(), json!(1));
    params.insert("attributesToRetrieve".to_string(), json!(["title"]));
    let result = index.search("prince", Some(&params)).await.unwrap();
    assert_eq!(result["limit"], 1);
    assert_eq!(result["hits"].as_array().unwrap().len(), 1);
    assert!(result["hits"][0].get("genre").is_none());

    let everything = index.search("", None).await.unwrap();
    assert_eq!(everything["nbHits"], 6);
}

#[tokio::test]
async fn search_on_missing_index_is_404() {
    let client = client().await;
    let err = client.index("ghost").search("x", None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn settings_round_trip() {
    let client = client().await;
    let index = client.create_index("movies", None).await.unwrap();

    let defaults = index.get_settings().await.unwrap();
    assert_eq!(defaults["searchableAttributes"], json!(["*"]));

    index
        .update_settings(&json!({"stopWords": ["the"], "distinctAttribute": "title"}))
        .await
        .unwrap();
    let settings = index.get_settings().await.unwrap();
    assert_eq!(settings["stopWords"], json!(["the"]));
    assert_eq!(settings["distinctAttribute"], "title");

    index.reset_settings().await.unwrap();
    assert_eq!(index.get_settings().await.unwrap(), defaults);
}

#[tokio::test]
async fn individual_settings_round_trip() {
    let client = client().await;
    let index = client.create_index("movies", None).await.unwrap();

    index.update_ranking_rules(&["typo", "words"]).await.unwrap();
    assert_eq!(index.get_ranking_rules().await.unwrap(), json!(["typo", "words"]));
    index.reset_ranking_rules().await.unwrap();
    assert_eq!(index.get_ranking_rules().await.unwrap().as_array().unwrap().len(), 6);

    index.update_distinct_attribute("genre").await.unwrap();
    assert_eq!(index.get_distinct_attribute().await.unwrap(), "genre");
    index.reset_distinct_attribute().await.unwrap();
    assert_eq!(index.get_distinct_attribute().await.unwrap(), Value::Null);

    index.update_searchable_attributes(&["title"]).await.unwrap();
    assert_eq!(index.get_searchable_attributes().await.unwrap(), json!(["title"]));
    index.reset_searchable_attributes().await.unwrap();
    assert_eq!(index.get_searchable_attributes().await.unwrap(), json!(["*"]));

    let displayed = vec!["title".to_string(), "genre".to_string()];
    index.update_displayed_attributes(&displayed).await.unwrap();
    assert_eq!(index.get_displayed_attributes().await.unwrap(), json!(["title", "genre"]));
    index.reset_displayed_attributes().await.unwrap();
    assert_eq!(index.get_displayed_attributes().await.unwrap(), json!(["*"]));

    index.update_stop_words(&["a", "the"]).await.unwrap();
    assert_eq!(index.get_stop_words().await.unwrap(), json!(["a", "the"]));
    index.reset_stop_words().await.unwrap();
    assert_eq!(index.get_stop_words().await.unwrap(), json!([]));

    let synonyms = HashMap::from([(
        "wolverine".to_string(),
        vec!["logan".to_string(), "xmen".to_string()],
    )]);
    index.update_synonyms(&synonyms).await.unwrap();
    assert_eq!(
        index.get_synonyms().await.unwrap(),
        json!({"wolverine": ["logan", "xmen"]})
    );
    index.reset_synonyms().await.unwrap();
    assert_eq!(index.get_synonyms().await.unwrap(), json!({}));

    index.update_filterable_attributes(&["genre"]).await.unwrap();
    assert_eq!(index.get_filterable_attributes().await.unwrap(), json!(["genre"]));
    index.reset_filterable_attributes().await.unwrap();
    assert_eq!(index.get_filterable_attributes().await.unwrap(), json!([]));

    index.update_sortable_attributes(&["id"]).await.unwrap();
    assert_eq!(index.get_sortable_attributes().await.unwrap(), json!(["id"]));
    index.reset_sortable_attributes().await.unwrap();
    assert_eq!(index.get_sortable_attributes().await.unwrap(), json!([]));
}

#[tokio::test]
async fn displayed_attributes_shape_documents() {
    let client = client().await;
    let index = client.index("movies");
    index.add_documents(&movies(), None).await.unwrap();
    index.update_displayed_attributes(&["title"]).await.unwrap();
    assert_eq!(index.get_document(42).await.unwrap(), json!({"title": "The Hitchhiker's Guide to the Galaxy"}));
}

// ---------------------------------------------------------------------------
// Stats, dumps, tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_cover_every_index() {
    let client = client().await;
    client.index("movies").add_documents(&movies(), None).await.unwrap();
    client.create_index("books", None).await.unwrap();

    let stats = client.get_all_stats().await.unwrap();
    assert_eq!(stats["indexes"]["movies"]["numberOfDocuments"], 6);
    assert_eq!(stats["indexes"]["movies"]["fieldDistribution"]["genre"], 6);
    assert_eq!(stats["indexes"]["books"]["numberOfDocuments"], 0);
    assert!(stats["lastUpdate"].is_string());
}

#[tokio::test]
async fn dump_creation_and_status() {
    let client = client().await;
    let dump = client.create_dump().await.unwrap();
    assert_eq!(dump["status"], "in_progress");

    let uid = dump["uid"].as_str().unwrap();
    assert_eq!(client.get_dump_status(uid).await.unwrap()["status"], "done");

    let err = client.get_dump_status("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn tasks_are_listed_and_awaited() {
    let client = client().await;
    client.index("movies").add_documents(&movies(), None).await.unwrap();
    client.index("books").add_documents(&[json!({"id": 1})], None).await.unwrap();

    let tasks = client.get_tasks(None).await.unwrap();
    assert_eq!(tasks["results"].as_array().unwrap().len(), 2);

    let scoped = client.get_tasks(Some("books")).await.unwrap();
    assert_eq!(scoped["results"][0]["uid"], 1);

    assert_eq!(client.get_task(0, None).await.unwrap()["indexUid"], "movies");
    assert_eq!(client.get_task(1, Some("books")).await.unwrap()["status"], "succeeded");

    let settled = client.wait_for_task(1, None, Some(Duration::from_millis(10))).await.unwrap();
    assert_eq!(settled["status"], "succeeded");

    let err = client.get_task(99, None).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}
