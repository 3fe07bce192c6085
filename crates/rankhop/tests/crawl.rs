mod common;

use std::sync::{Arc, Mutex};

use common::{Catalog, FakeProvider};
use rankhop::config::ScrapeConfig;
use rankhop::handler::CatalogHandler;
use rankhop::mitigate::Mitigator;
use rankhop::partition;
use rankhop::sink::Dataset;
use rankhop_crawler::{run_crawl, CrawlerConfig};
use std::time::Duration;

fn crawler_conf() -> CrawlerConfig {
    CrawlerConfig {
        max_concurrency: 1,
        requests_per_minute: 600,
        session_max_usage: 1,
        retire_after_page_count: 10,
        max_request_retries: 0,
        request_timeout_secs: 60,
        backoff_base_secs: 1,
    }
}

fn scrape_conf(total_shards: usize, rows_per_shard: u64) -> ScrapeConfig {
    ScrapeConfig {
        base_url: "https://catalog.test/search".to_string(),
        dataset: "test".to_string(),
        total_shards,
        rows_per_shard,
        shard_offset: 0,
        rows_to_scrape: rows_per_shard,
        rows_per_page: 5,
        max_pages_per_request: 0,
        wait_short_secs: 1,
        wait_long_secs: 1,
    }
}

fn harness(
    conf: &ScrapeConfig,
    catalog: Arc<Mutex<Catalog>>,
) -> (Arc<Dataset>, Arc<CatalogHandler>, Arc<FakeProvider>) {
    let sink = Arc::new(Dataset::new(&conf.dataset));
    let mitigator = Arc::new(Mitigator::new(
        "test-run",
        Duration::from_secs(conf.wait_short_secs),
        Duration::from_secs(conf.wait_long_secs),
    ));
    let handler = Arc::new(CatalogHandler::new(
        conf.clone(),
        sink.clone(),
        mitigator,
    ));
    let provider = Arc::new(FakeProvider::new(catalog));
    (sink, handler, provider)
}

fn rank_of(record: &serde_json::Value) -> u64 {
    record["cbRank"]
        .as_str()
        .unwrap()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn shards_are_covered_and_details_fanned_out() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(30, 5, 3)));
    let conf = scrape_conf(2, 15);
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(
        &crawler_conf(),
        handler,
        provider,
        partition::seed_requests(&conf),
    )
    .await
    .unwrap();

    // 2 listings + one detail per linked row (ranks 3, 6, .., 30)
    assert_eq!(report.submitted, 12);
    assert_eq!(report.succeeded, 12);
    assert_eq!(report.failed, 0);
    assert_eq!(report.retried, 0);

    let records = sink.records();
    let listings: Vec<_> = records.iter().filter(|r| r.get("cbRank").is_some()).collect();
    let details: Vec<_> = records
        .iter()
        .filter(|r| r.get("fullPageText").is_some())
        .collect();
    assert_eq!(listings.len(), 30);
    assert_eq!(details.len(), 10);

    // with one worker the first shard settles before the second starts
    let ranks: Vec<u64> = listings.iter().map(|r| rank_of(r)).collect();
    assert_eq!(ranks[..15], (1..=15).collect::<Vec<u64>>()[..]);
    assert_eq!(ranks[15..], (16..=30).collect::<Vec<u64>>()[..]);

    for detail in &details {
        let url = detail["url"].as_str().unwrap();
        assert!(url.starts_with("https://catalog.test/organization/org-"));
        assert!(detail["aboutFields"].is_array());
        assert!(detail["people"].is_array());
    }
}

#[tokio::test]
async fn thirty_rows_at_fifteen_per_page_take_two_iterations() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(30, 15, 1)));
    let conf = ScrapeConfig {
        rows_per_page: 15,
        rows_to_scrape: 30,
        ..scrape_conf(1, 30)
    };
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(
        &crawler_conf(),
        handler,
        provider,
        partition::seed_requests(&conf),
    )
    .await
    .unwrap();

    // every row links out, so one detail request per row
    assert_eq!(report.submitted, 31);
    assert_eq!(report.succeeded, 31);
    assert_eq!(sink.len(), 60);

    let marker_waits = catalog
        .lock()
        .unwrap()
        .wait_attempts
        .iter()
        .filter(|s| s.as_str() == rankhop::extract::sel::ROW_MARKER)
        .count();
    assert_eq!(marker_waits, 2);
}

#[tokio::test]
async fn stalled_lineage_fails_without_poisoning_siblings() {
    let mut catalog = Catalog::ranked(30, 5, 0);
    catalog.freeze_at = Some(15);
    let catalog = Arc::new(Mutex::new(catalog));

    let conf = scrape_conf(2, 15);
    let crawler = CrawlerConfig {
        max_request_retries: 1,
        ..crawler_conf()
    };
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(&crawler, handler, provider, partition::seed_requests(&conf))
        .await
        .unwrap();

    // the frozen shard (seeded at 15) stalls on both attempts
    assert_eq!(report.submitted, 3);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.retried, 1);

    let records = sink.records();
    assert_eq!(records.len(), 15);
    assert!(records.iter().all(|r| rank_of(r) <= 15));
}

#[tokio::test]
async fn short_page_ends_a_lineage_gracefully() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(8, 5, 0)));
    let conf = scrape_conf(1, 15);
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(
        &crawler_conf(),
        handler,
        provider,
        partition::seed_requests(&conf),
    )
    .await
    .unwrap();

    assert_eq!(report.submitted, 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(sink.len(), 8);
}

#[tokio::test]
async fn crawl_futures_move_across_worker_threads() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(8, 5, 0)));
    let conf = scrape_conf(1, 15);
    let (sink, handler, provider) = harness(&conf, catalog);
    let crawler = crawler_conf();
    let seeds = partition::seed_requests(&conf);

    // spawning requires the whole crawl future, page borrows included, to be Send
    let report = tokio::spawn(async move { run_crawl(&crawler, handler, provider, seeds).await })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(sink.len(), 8);
}

#[tokio::test]
async fn empty_catalog_drains_without_errors() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(0, 5, 0)));
    let conf = scrape_conf(1, 15);
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(
        &crawler_conf(),
        handler,
        provider,
        partition::seed_requests(&conf),
    )
    .await
    .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn page_cap_hands_off_to_continuation_requests() {
    let catalog = Arc::new(Mutex::new(Catalog::ranked(30, 5, 0)));
    let conf = ScrapeConfig {
        max_pages_per_request: 1,
        ..scrape_conf(1, 15)
    };
    let (sink, handler, provider) = harness(&conf, catalog.clone());

    let report = run_crawl(
        &crawler_conf(),
        handler,
        provider,
        partition::seed_requests(&conf),
    )
    .await
    .unwrap();

    // initial-0 then next-5 then next-10, one page each
    assert_eq!(report.submitted, 3);
    assert_eq!(report.succeeded, 3);
    assert_eq!(sink.len(), 15);

    let ranks: Vec<u64> = sink.records().iter().map(rank_of).collect();
    assert_eq!(ranks, (1..=15).collect::<Vec<u64>>());
}
