use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, process};

use clap::Parser;
use rankhop::config::ScrapeConfig;
use rankhop::handler::CatalogHandler;
use rankhop::mitigate::Mitigator;
use rankhop::partition;
use rankhop::run::RunContext;
use rankhop::sink::{CsvWriterConfig, Dataset};
use rankhop_crawler::{run_crawl, CrawlerConfig};
use rankhop_page::{ChromeProvider, Viewport};
use tokio::runtime;

/// Ranked catalog crawler
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "crawl")]
    Crawl(CrawlArgs),
    #[clap(name = "export")]
    Export(ExportArgs),
}

/// Crawl the ranked catalog and spool scraped records
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Optional crawler yaml configuration file
    #[clap(env = "RANKHOP_CRAWLER_CONFIG", parse(from_os_str), long)]
    pub crawler_config: Option<PathBuf>,
    /// Optional scrape yaml configuration file
    #[clap(env = "RANKHOP_SCRAPE_CONFIG", parse(from_os_str), long)]
    pub scrape_config: Option<PathBuf>,
    /// Override the listing URL
    #[clap(long)]
    pub base_url: Option<String>,
    /// Override the dataset name
    #[clap(long)]
    pub dataset: Option<String>,
    /// Override the number of shards
    #[clap(long)]
    pub total_shards: Option<usize>,
    /// Override the first shard index
    #[clap(long)]
    pub shard_offset: Option<usize>,
    /// Override the rows each shard covers
    #[clap(long)]
    pub rows_to_scrape: Option<u64>,
    /// Override the maximum concurrent requests
    #[clap(long)]
    pub max_concurrency: Option<usize>,
    /// Override the per-minute request budget
    #[clap(long)]
    pub requests_per_minute: Option<usize>,
    /// Override the retry budget per request
    #[clap(long)]
    pub max_request_retries: Option<u32>,
    /// Directory the JSONL spool is written under
    #[clap(parse(from_os_str), long, default_value = "storage")]
    pub spool_dir: PathBuf,
    /// Save challenge screenshots under this directory
    #[clap(parse(from_os_str), long)]
    pub debug_dir: Option<PathBuf>,
    /// Single-shard smoke profile (1 shard, 320 rows)
    #[clap(long)]
    pub debug_run: bool,
    /// Run the browser with a visible window
    #[clap(long)]
    pub headful: bool,
    /// Also export the dataset as CSV after the crawl
    #[clap(parse(from_os_str), long, short)]
    pub output_file: Option<PathBuf>,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.crawler_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(max_concurrency) = args.max_concurrency {
            conf.max_concurrency = max_concurrency;
        }
        if let Some(requests_per_minute) = args.requests_per_minute {
            conf.requests_per_minute = requests_per_minute;
        }
        if let Some(max_request_retries) = args.max_request_retries {
            conf.max_request_retries = max_request_retries;
        }
        Ok(conf)
    }
}

impl TryFrom<&CrawlArgs> for ScrapeConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.scrape_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            ScrapeConfig::default()
        };
        if let Some(base_url) = &args.base_url {
            conf.base_url = base_url.to_string();
        }
        if let Some(dataset) = &args.dataset {
            conf.dataset = dataset.to_string();
        }
        if let Some(total_shards) = args.total_shards {
            conf.total_shards = total_shards;
        }
        if let Some(shard_offset) = args.shard_offset {
            conf.shard_offset = shard_offset;
        }
        if let Some(rows_to_scrape) = args.rows_to_scrape {
            conf.rows_to_scrape = rows_to_scrape;
        }
        if args.debug_run {
            conf = conf.debug_run();
        }
        Ok(conf)
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let crawler_conf: CrawlerConfig = (&args).try_into()?;
    let scrape_conf: ScrapeConfig = (&args).try_into()?;

    let run = RunContext::new(scrape_conf.dataset.clone());
    log::info!("starting run {} on dataset {}", run.run_id, run.dataset);

    let sink = Arc::new(Dataset::new(&scrape_conf.dataset).with_spool(&args.spool_dir, &run.run_id)?);
    let mut mitigator = Mitigator::new(
        run.run_id.clone(),
        Duration::from_secs(scrape_conf.wait_short_secs),
        Duration::from_secs(scrape_conf.wait_long_secs),
    );
    if let Some(dir) = &args.debug_dir {
        mitigator = mitigator.with_screenshot_dir(dir);
    }
    let mitigator = Arc::new(mitigator);

    let seeds = partition::seed_requests(&scrape_conf);
    let provider = Arc::new(ChromeProvider::new(!args.headful, Viewport::default()));
    let handler = Arc::new(CatalogHandler::new(
        scrape_conf,
        sink.clone(),
        mitigator.clone(),
    ));

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let report = rt.block_on(run_crawl(&crawler_conf, handler, provider, seeds))?;

    log::info!(
        "run {} done: {} submitted, {} succeeded, {} failed, {} retried, {} records, {} challenges",
        run.run_id,
        report.submitted,
        report.succeeded,
        report.failed,
        report.retried,
        sink.len(),
        mitigator.events().len(),
    );
    if let Some(path) = sink.finalize() {
        log::info!("spooled to {}", path.display());
    }
    if let Some(out) = &args.output_file {
        sink.export_csv(&CsvWriterConfig::default(), Some(out.as_path()))?;
    }
    Ok(())
}

/// Export a spooled run as CSV
#[derive(Debug, clap::Args)]
pub struct ExportArgs {
    /// Path to a JSONL spool file from a previous run
    #[clap(parse(from_os_str), long, short)]
    pub spool: PathBuf,
    /// Output CSV file; stdout when absent
    #[clap(parse(from_os_str), long, short)]
    pub output_file: Option<PathBuf>,
    /// CSV field delimiter
    #[clap(long, default_value = ",")]
    pub delimiter: char,
}

pub fn export(args: ExportArgs) -> anyhow::Result<()> {
    let dataset = Dataset::from_spool("export", &args.spool)?;
    let conf = CsvWriterConfig {
        delimiter: args.delimiter,
        ..Default::default()
    };
    dataset.export_csv(&conf, args.output_file.as_deref())
}

fn main() {
    let args = Args::parse();

    let res = match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                if env::var("RUST_LOG").is_err() {
                    env::set_var("RUST_LOG", "rankhop=info,rankhop_crawler=info");
                }
                env_logger::init();
            }
            crawl(args)
        }
        SubCommand::Export(args) => {
            env_logger::init();
            export(args)
        }
    };

    if let Err(e) = res {
        log::error!("{e:#}");
        process::exit(1);
    }
}
