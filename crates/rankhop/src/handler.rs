use std::sync::Arc;

use async_trait::async_trait;
use rankhop_crawler::{CrawlError, Label, Request, RequestHandler, RequestTx};
use rankhop_page::PageSession;

use crate::config::ScrapeConfig;
use crate::cursor::PageCursor;
use crate::extract::{self, sel};
use crate::mitigate::{Interaction, Mitigator};
use crate::sink::Dataset;

/// Crawl logic for the ranked catalog: listing requests walk their shard
/// with a rank cursor and fan out detail requests for every linked row;
/// detail requests are leaves.
pub struct CatalogHandler {
    conf: ScrapeConfig,
    sink: Arc<Dataset>,
    mitigator: Arc<Mitigator>,
}

impl CatalogHandler {
    pub fn new(conf: ScrapeConfig, sink: Arc<Dataset>, mitigator: Arc<Mitigator>) -> Self {
        Self {
            conf,
            sink,
            mitigator,
        }
    }

    async fn handle_listing(
        &self,
        req: &Request,
        page: &mut dyn PageSession,
        tx: &RequestTx,
    ) -> Result<(), CrawlError> {
        let start = req
            .label
            .cursor()
            .ok_or_else(|| CrawlError::InvalidLabel(req.unique_key.clone()))?;
        let mut cursor = PageCursor::new(start);
        let mut remaining = req.budget.unwrap_or(self.conf.rows_to_scrape);
        let mut pages = 0u64;

        while remaining > 0 {
            if self.conf.max_pages_per_request > 0 && pages == self.conf.max_pages_per_request {
                log::info!(
                    "lineage {}: handing off at rank {} with {remaining} rows left",
                    start.lineage,
                    cursor.rank()
                );
                tx.send(Request::continuation(
                    self.conf.base_url.clone(),
                    cursor.cursor(),
                    remaining,
                ));
                return Ok(());
            }

            let rows = cursor.advance(page, &self.mitigator, &self.conf).await?;
            pages += 1;
            if rows.is_empty() {
                log::info!(
                    "lineage {}: no rows at rank {}, shard drained",
                    start.lineage,
                    cursor.rank()
                );
                return Ok(());
            }

            let short_page = (rows.len() as u64) < self.conf.rows_per_page;
            for row in &rows {
                self.sink.push(row)?;
                if let Some(link) = &row.organization_link {
                    match resolve(&self.conf.base_url, link) {
                        Ok(url) => {
                            tx.send(Request::detail(url));
                        }
                        Err(e) => log::warn!("skipping unresolvable link `{link}`: {e}"),
                    }
                }
            }
            remaining = remaining.saturating_sub(rows.len() as u64);

            if short_page {
                log::info!(
                    "lineage {}: short page ({} rows), stopping with {remaining} rows uncovered",
                    start.lineage,
                    rows.len()
                );
                return Ok(());
            }
        }
        Ok(())
    }

    async fn handle_details(
        &self,
        req: &Request,
        page: &mut dyn PageSession,
    ) -> Result<(), CrawlError> {
        self.mitigator
            .guarded_interact(
                page,
                Interaction::WaitVisible {
                    selector: sel::PROFILE_MARKER,
                },
            )
            .await?;
        let details = extract::extract_details(page, &req.url).await?;
        self.sink.push(&details)?;
        Ok(())
    }
}

#[async_trait]
impl RequestHandler for CatalogHandler {
    async fn handle(
        &self,
        req: &Request,
        page: &mut dyn PageSession,
        tx: &RequestTx,
    ) -> Result<(), CrawlError> {
        match &req.label {
            Label::Initial(_) | Label::Next(_) => self.handle_listing(req, page, tx).await,
            Label::OrgDetails => self.handle_details(req, page).await,
        }
    }
}

/// Resolve a row's (usually relative) organization link against the listing
/// URL.
fn resolve(base: &str, link: &str) -> Result<String, url::ParseError> {
    Ok(url::Url::parse(base)?.join(link)?.to_string())
}
