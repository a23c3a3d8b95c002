//! Polling of asynchronous server operations (updates and tasks).
//!
//! Writes to MeiliSearch are queued server-side and answered with an
//! identifier. These helpers re-fetch the status object until it leaves the
//! `enqueued`/`processing` states or the deadline passes.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::paths;
use crate::error::{Error, Result};
use crate::http::path_segment;

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(50);

/// Whether a task or update status object is still waiting to be processed.
pub fn is_pending(status: &Value) -> bool {
    matches!(
        status.get("status").and_then(Value::as_str),
        Some("enqueued" | "processing")
    )
}

/// Route of the task list, or of one task, optionally scoped to an index.
pub(crate) fn task_path(index_uid: Option<&str>, task_uid: Option<u64>) -> String {
    let base = match index_uid {
        Some(index) => format!("{}/{}/{}", paths::INDEXES, path_segment(index), paths::TASKS),
        None => paths::TASKS.to_string(),
    };
    match task_uid {
        Some(uid) => format!("{base}/{uid}"),
        None => base,
    }
}

/// Call `fetch` every `interval` until the returned status settles.
pub(crate) async fn wait_until_settled<F, Fut>(
    what: &str,
    timeout: Option<Duration>,
    interval: Option<Duration>,
    mut fetch: F,
) -> Result<Value>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let timeout = timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT);
    let interval = interval.unwrap_or(DEFAULT_WAIT_INTERVAL);
    let started = Instant::now();

    while started.elapsed() < timeout {
        let status = fetch().await?;
        if !is_pending(&status) {
            return Ok(status);
        }
        debug!(what, status = ?status.get("status"), "still pending");
        sleep(interval).await;
    }

    Err(Error::Timeout(format!(
        "timeout of {}ms exceeded while waiting for {what}",
        timeout.as_millis()
    )))
}
