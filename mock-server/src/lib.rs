//! In-memory stand-in for a MeiliSearch server.
//!
//! Speaks the subset of the REST API the client uses, with MeiliSearch's
//! status codes and error bodies. Writes are applied immediately and their
//! updates/tasks are already final when the `updateId` is returned.

pub mod error;
mod handlers;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

use error::MeiliError;
use handlers::*;
use store::Store;

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    store: Db,
    master_key: Option<Arc<str>>,
    private_key: Arc<str>,
    public_key: Arc<str>,
}

impl AppState {
    fn new(master_key: Option<&str>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::new())),
            master_key: master_key.map(Arc::from),
            private_key: Arc::from(Uuid::new_v4().simple().to_string()),
            public_key: Arc::from(Uuid::new_v4().simple().to_string()),
        }
    }
}

/// Server without authentication.
pub fn app() -> Router {
    router(AppState::new(None))
}

/// Server that requires `Authorization: Bearer <master_key>` on every route
/// except `/health`.
pub fn app_with_master_key(master_key: &str) -> Router {
    router(AppState::new(Some(master_key)))
}

fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/version", get(version))
        .route("/keys", get(keys))
        .route("/stats", get(stats))
        .route("/dumps", post(create_dump))
        .route("/dumps/{uid}/status", get(dump_status))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{task_uid}", get(get_task))
        .route("/indexes", get(list_indexes).post(create_index))
        .route(
            "/indexes/{uid}",
            get(get_index).put(update_index).delete(delete_index),
        )
        .route("/indexes/{uid}/stats", get(index_stats))
        .route("/indexes/{uid}/updates", get(list_updates))
        .route("/indexes/{uid}/updates/{update_id}", get(get_update))
        .route("/indexes/{uid}/tasks", get(list_index_tasks))
        .route("/indexes/{uid}/tasks/{task_uid}", get(get_index_task))
        .route("/indexes/{uid}/search", post(search))
        .route(
            "/indexes/{uid}/documents",
            get(get_documents)
                .post(add_documents)
                .put(update_documents)
                .delete(clear_documents),
        )
        .route("/indexes/{uid}/documents/delete-batch", post(delete_documents))
        .route(
            "/indexes/{uid}/documents/{id}",
            get(get_document).delete(delete_document),
        )
        .route(
            "/indexes/{uid}/settings",
            get(get_settings).post(update_settings).delete(reset_settings),
        )
        .route(
            "/indexes/{uid}/settings/{name}",
            get(get_setting).post(update_setting).delete(reset_setting),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_key));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}

async fn require_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, MeiliError> {
    if let Some(master_key) = &state.master_key {
        let provided = request
            .headers()
            .get(AUTHORIZATION)
            .ok_or_else(MeiliError::missing_authorization_header)?
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "));
        if provided != Some(&**master_key) {
            return Err(MeiliError::invalid_api_key());
        }
    }
    Ok(next.run(request).await)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

/// Serve `app` on a random local port in the background and return its
/// base URL.
pub async fn spawn(app: Router) -> Result<String, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = run(listener, app).await {
            tracing::error!(%err, "mock server stopped");
        }
    });
    Ok(format!("http://{addr}"))
}
