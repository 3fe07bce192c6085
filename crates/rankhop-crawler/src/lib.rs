mod config;
mod crawler;
mod error;
mod limiter;
mod queue;
mod request;
mod session;

pub use config::CrawlerConfig;
pub use crawler::{run_crawl, BrowserPool, CrawlReport, RequestHandler};
pub use error::CrawlError;
pub use limiter::RateLimiter;
pub use queue::{request_queue, RequestRx, RequestTx};
pub use request::{Cursor, Label, Request};
pub use session::{Session, SessionPool};

pub use anyhow;
