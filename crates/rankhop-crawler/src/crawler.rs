use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use rankhop_page::{BrowserInstance, BrowserProvider, PageError, PageSession};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::limiter::RateLimiter;
use crate::queue::{request_queue, RequestTx};
use crate::request::Request;
use crate::session::SessionPool;

/// Per-request crawl logic. The scheduler navigates the page to the request
/// URL before calling `handle`; fan-out goes through `tx` and is subject to
/// the queue's idempotent-submission rules.
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    async fn handle(
        &self,
        req: &Request,
        page: &mut dyn PageSession,
        tx: &RequestTx,
    ) -> Result<(), CrawlError>;
}

/// Hands out pages from a single active browser instance, retiring the
/// instance after it has served `retire_after` pages so fingerprint-level
/// identity rotates.
pub struct BrowserPool {
    provider: Arc<dyn BrowserProvider>,
    retire_after: u32,
    launched: AtomicUsize,
    active: Mutex<Option<(Box<dyn BrowserInstance>, u32)>>,
}

impl BrowserPool {
    pub fn new(provider: Arc<dyn BrowserProvider>, retire_after: u32) -> Self {
        Self {
            provider,
            retire_after: retire_after.max(1),
            launched: AtomicUsize::new(0),
            active: Mutex::new(None),
        }
    }

    pub async fn page(&self) -> Result<Box<dyn PageSession>, PageError> {
        let mut slot = self.active.lock().await;
        let (mut instance, served) = match slot.take() {
            Some((instance, served)) if served < self.retire_after => (instance, served),
            Some((_, served)) => {
                log::debug!("retiring browser instance after {served} pages");
                self.launch().await?
            }
            None => self.launch().await?,
        };
        let page = instance.new_page().await?;
        *slot = Some((instance, served + 1));
        Ok(page)
    }

    async fn launch(&self) -> Result<(Box<dyn BrowserInstance>, u32), PageError> {
        let n = self.launched.fetch_add(1, Ordering::SeqCst) + 1;
        let instance = self.provider.launch(&format!("browser-{n}")).await?;
        Ok((instance, 0))
    }

    /// Number of browser instances launched so far.
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
}

#[derive(Default)]
struct Counters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

/// Run the crawl to quiescence: seed the queue, dispatch requests under the
/// rate/concurrency gates, and return once every submitted request has
/// settled. Ctrl-C interrupts the run with an error.
pub async fn run_crawl<H>(
    conf: &CrawlerConfig,
    handler: Arc<H>,
    provider: Arc<dyn BrowserProvider>,
    seeds: Vec<Request>,
) -> Result<CrawlReport>
where
    H: RequestHandler,
{
    let (tx, rx) = request_queue();
    for req in seeds {
        tx.send(req);
    }

    let limiter = RateLimiter::per_minute(conf.requests_per_minute);
    let sessions = Arc::new(SessionPool::new(conf.session_max_usage));
    let browsers = Arc::new(BrowserPool::new(provider, conf.retire_after_page_count));
    let settled = Arc::new(AtomicUsize::new(0));
    let counters = Arc::new(Counters::default());

    let max_retries = conf.max_request_retries;
    let backoff_base = conf.backoff_base_secs;
    let request_timeout = Duration::from_secs(conf.request_timeout_secs);
    let max_concurrency = conf.max_concurrency.max(1);

    // Dispatcher

    let dispatcher = {
        let tx = tx.clone();
        let settled = settled.clone();
        let counters = counters.clone();
        UnboundedReceiverStream::new(rx)
            .map(move |req| {
                let limiter = limiter.clone();
                let tx = tx.clone();
                let handler = handler.clone();
                let sessions = sessions.clone();
                let browsers = browsers.clone();
                let settled = settled.clone();
                let counters = counters.clone();
                async move {
                    limiter.admit().await;
                    let res = attempt(
                        &*handler,
                        &req,
                        &sessions,
                        &browsers,
                        &tx,
                        request_timeout,
                    )
                    .await;
                    match res {
                        Ok(()) => {
                            counters.succeeded.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) if req.retries < max_retries => {
                            log::warn!(
                                "request {} failed on attempt {}/{}: {e}",
                                req.unique_key,
                                req.retries + 1,
                                max_retries + 1
                            );
                            if e.wants_backoff() {
                                let delay = backoff_base << req.retries.min(8);
                                tokio::time::sleep(Duration::from_secs(delay)).await;
                            }
                            counters.retried.fetch_add(1, Ordering::SeqCst);
                            tx.resend(req.retried());
                        }
                        Err(e) => {
                            log::error!(
                                "abandoning request {} after {} attempts: {e}",
                                req.unique_key,
                                req.retries + 1
                            );
                            counters.failed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                    settled.fetch_add(1, Ordering::SeqCst);
                }
            })
            .buffer_unordered(max_concurrency)
            .for_each(|_| async {})
    };

    // Done watcher: quiescent when every accepted submission has settled.

    let done = {
        let settled = settled.clone();
        let tx = tx.clone();
        async move {
            loop {
                match timeout(Duration::from_millis(500), tokio::signal::ctrl_c()).await {
                    Ok(_) => return Err(anyhow!("interrupted")),
                    Err(_) => {
                        if settled.load(Ordering::SeqCst) >= tx.submitted() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    };

    tokio::pin!(dispatcher);
    tokio::pin!(done);
    tokio::select! {
        res = &mut done => res?,
        _ = &mut dispatcher => unreachable!("request queue never closes"),
    }

    Ok(CrawlReport {
        submitted: tx.submitted(),
        succeeded: counters.succeeded.load(Ordering::SeqCst),
        failed: counters.failed.load(Ordering::SeqCst),
        retried: counters.retried.load(Ordering::SeqCst),
    })
}

async fn attempt<H>(
    handler: &H,
    req: &Request,
    sessions: &SessionPool,
    browsers: &BrowserPool,
    tx: &RequestTx,
    budget: Duration,
) -> Result<(), CrawlError>
where
    H: RequestHandler,
{
    let session = sessions.checkout();
    log::debug!("request {} running under {}", req.unique_key, session.id);
    let res = async {
        let mut page = browsers.page().await?;
        page.goto(&req.url).await?;
        match timeout(budget, handler.handle(req, page.as_mut(), tx)).await {
            Ok(res) => res,
            Err(_) => Err(CrawlError::RequestTimeout(budget)),
        }
    }
    .await;
    sessions.give_back(session);
    res
}
