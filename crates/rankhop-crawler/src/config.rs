use serde::{Deserialize, Serialize};

/// Resource governor and scheduler knobs. The defaults are the fully serial,
/// maximally cautious profile: one request at a time, fresh session and fresh
/// browser per request, no retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    /// Hard ceiling on in-flight requests.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Request admissions per minute, independent of concurrency.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: usize,

    /// Fetches before a session identity is retired.
    #[serde(default = "default_session_max_usage")]
    pub session_max_usage: u32,

    /// Pages served before a browser instance is retired.
    #[serde(default = "default_retire_after_page_count")]
    pub retire_after_page_count: u32,

    /// Times a failed request may go back to pending.
    #[serde(default = "default_max_request_retries")]
    pub max_request_retries: u32,

    /// Whole-handler budget, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Base delay before retrying a rate-limited/blocked request, in seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            requests_per_minute: default_requests_per_minute(),
            session_max_usage: default_session_max_usage(),
            retire_after_page_count: default_retire_after_page_count(),
            max_request_retries: default_max_request_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            backoff_base_secs: default_backoff_base_secs(),
        }
    }
}

fn default_max_concurrency() -> usize {
    1
}

fn default_requests_per_minute() -> usize {
    60
}

fn default_session_max_usage() -> u32 {
    1
}

fn default_retire_after_page_count() -> u32 {
    1
}

fn default_max_request_retries() -> u32 {
    0
}

fn default_request_timeout_secs() -> u64 {
    600
}

fn default_backoff_base_secs() -> u64 {
    5
}
