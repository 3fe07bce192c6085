use serde::{Deserialize, Serialize};

/// Catalog-specific crawl parameters. Defaults are the full production
/// profile: 100 shards of 32k ranks over a ~3.2M row catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeConfig {
    /// Ranked listing URL every listing request navigates to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Dataset the sink appends records under.
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Number of parallel crawl lineages.
    #[serde(default = "default_total_shards")]
    pub total_shards: usize,

    /// Rank-space width of one shard; also each seed's spacing.
    #[serde(default = "default_rows_per_shard")]
    pub rows_per_shard: u64,

    /// First shard index, for splitting the space across machines.
    #[serde(default)]
    pub shard_offset: usize,

    /// Rows each lineage is asked to cover.
    #[serde(default = "default_rows_to_scrape")]
    pub rows_to_scrape: u64,

    /// Rows the remote renders per page.
    #[serde(default = "default_rows_per_page")]
    pub rows_per_page: u64,

    /// Page-fetch iterations one listing request may run before enqueuing a
    /// continuation; 0 means the whole shard in one request.
    #[serde(default)]
    pub max_pages_per_request: u64,

    /// First-attempt element wait, in seconds.
    #[serde(default = "default_wait_short_secs")]
    pub wait_short_secs: u64,

    /// Post-mitigation fallback wait, in seconds.
    #[serde(default = "default_wait_long_secs")]
    pub wait_long_secs: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            dataset: default_dataset(),
            total_shards: default_total_shards(),
            rows_per_shard: default_rows_per_shard(),
            shard_offset: 0,
            rows_to_scrape: default_rows_to_scrape(),
            rows_per_page: default_rows_per_page(),
            max_pages_per_request: 0,
            wait_short_secs: default_wait_short_secs(),
            wait_long_secs: default_wait_long_secs(),
        }
    }
}

impl ScrapeConfig {
    /// Single-shard smoke profile for debugging a run end to end.
    pub fn debug_run(mut self) -> Self {
        self.total_shards = 1;
        self.rows_to_scrape = 320;
        self
    }
}

fn default_base_url() -> String {
    String::from("https://www.crunchbase.com/search/organization.companies")
}

fn default_dataset() -> String {
    String::from("default")
}

fn default_total_shards() -> usize {
    100
}

fn default_rows_per_shard() -> u64 {
    32_000
}

fn default_rows_to_scrape() -> u64 {
    32_000
}

fn default_rows_per_page() -> u64 {
    15
}

fn default_wait_short_secs() -> u64 {
    7
}

fn default_wait_long_secs() -> u64 {
    20
}
