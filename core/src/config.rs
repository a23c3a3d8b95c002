//! Connection settings and REST route names.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

pub const URL_ENV: &str = "MEILISEARCH_URL";
pub const API_KEY_ENV: &str = "MEILISEARCH_API_KEY";
pub const TIMEOUT_ENV: &str = "MEILISEARCH_TIMEOUT_MS";

/// Route segments of the MeiliSearch REST API.
pub mod paths {
    pub const HEALTH: &str = "health";
    pub const KEYS: &str = "keys";
    pub const VERSION: &str = "version";
    pub const INDEXES: &str = "indexes";
    pub const TASKS: &str = "tasks";
    pub const UPDATES: &str = "updates";
    pub const STATS: &str = "stats";
    pub const SEARCH: &str = "search";
    pub const DOCUMENTS: &str = "documents";
    pub const SETTINGS: &str = "settings";
    pub const RANKING_RULES: &str = "ranking-rules";
    pub const DISTINCT_ATTRIBUTE: &str = "distinct-attribute";
    pub const SEARCHABLE_ATTRIBUTES: &str = "searchable-attributes";
    pub const DISPLAYED_ATTRIBUTES: &str = "displayed-attributes";
    pub const STOP_WORDS: &str = "stop-words";
    pub const SYNONYMS: &str = "synonyms";
    pub const FILTERABLE_ATTRIBUTES: &str = "filterable-attributes";
    pub const SORTABLE_ATTRIBUTES: &str = "sortable-attributes";
    pub const DUMPS: &str = "dumps";
}

/// Where the server lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Config {
    /// `url` is the server root, e.g. `http://localhost:7700`. A trailing
    /// slash is dropped.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Per-request timeout applied by the HTTP pool.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `MEILISEARCH_URL`, `MEILISEARCH_API_KEY` and
    /// `MEILISEARCH_TIMEOUT_MS`. Only the URL is required.
    pub fn from_env() -> Result<Self> {
        let url = env::var(URL_ENV)
            .map_err(|_| Error::Configuration(format!("{URL_ENV} is not set")))?;
        let mut config = Config::new(&url);

        match env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => config.api_key = Some(key),
            Ok(_) => warn!("{API_KEY_ENV} is empty, sending requests without a key"),
            Err(_) => {}
        }

        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .map_err(|e| Error::Configuration(format!("invalid {TIMEOUT_ENV} {raw:?}: {e}")))?;
            config.timeout = Some(Duration::from_millis(millis));
        }

        Ok(config)
    }
}
