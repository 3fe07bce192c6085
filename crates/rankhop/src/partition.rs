use rankhop_crawler::{Cursor, Request};

use crate::config::ScrapeConfig;

/// A contiguous slice of the rank space assigned to one crawl lineage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub seed_rank: u64,
    pub label: String,
    pub lineage: String,
}

/// Divide the rank space into `total_shards` lineages seeded at multiples
/// of `rows_per_shard`. Pure: only builds descriptors, enqueuing is the
/// scheduler's job. Overlap between neighbouring lineages is tolerated.
pub fn shards(conf: &ScrapeConfig) -> Vec<Shard> {
    (conf.shard_offset..conf.shard_offset + conf.total_shards)
        .map(|i| {
            let seed_rank = i as u64 * conf.rows_per_shard;
            Shard {
                seed_rank,
                label: format!("initial-{seed_rank}"),
                lineage: seed_rank.to_string(),
            }
        })
        .collect()
}

/// Seed listing requests for every shard, `unique_key == label`.
pub fn seed_requests(conf: &ScrapeConfig) -> Vec<Request> {
    shards(conf)
        .into_iter()
        .map(|shard| {
            Request::seed(
                conf.base_url.clone(),
                Cursor::new(shard.lineage, shard.seed_rank.to_string()),
                conf.rows_to_scrape,
            )
        })
        .collect()
}
