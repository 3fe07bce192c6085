use rankhop_crawler::{CrawlError, Cursor};
use rankhop_page::PageSession;

use crate::config::ScrapeConfig;
use crate::extract::{self, sel, Row};
use crate::mitigate::{Interaction, Mitigator};

/// Rank digits only. The remote renders ranks with grouping separators
/// ("1,204") but accepts bare numbers in the jump input, so equality checks
/// and re-submission both go through this form.
pub fn rank_digits(rank: &str) -> String {
    rank.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when advancing from `current` to `next` would revisit the same
/// rank. Compared digit-normalized so formatting changes never mask a
/// stall.
fn stalled(current: &str, next: &str) -> bool {
    let next = rank_digits(next);
    next.is_empty() || next == rank_digits(current)
}

/// Pagination driven by the remote's own ordering key. Each step jumps the
/// listing to the current rank, reads the rendered rows, then takes the
/// last row's rank as the next cursor value.
pub struct PageCursor {
    lineage: String,
    rank: String,
}

impl PageCursor {
    pub fn new(cursor: &Cursor) -> Self {
        Self {
            lineage: cursor.lineage.clone(),
            rank: cursor.rank.clone(),
        }
    }

    pub fn rank(&self) -> &str {
        &self.rank
    }

    /// Snapshot for a continuation request.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.lineage.clone(), self.rank.clone())
    }

    /// One cursor step. An empty page means the lineage has drained (not an
    /// error); a page whose last rank equals the current rank is a
    /// [`CrawlError::RankStall`] and fails the lineage.
    pub async fn advance(
        &mut self,
        page: &mut dyn PageSession,
        mitigator: &Mitigator,
        conf: &ScrapeConfig,
    ) -> Result<Vec<Row>, CrawlError> {
        let target = rank_digits(&self.rank);
        mitigator
            .guarded_interact(
                page,
                Interaction::Fill {
                    selector: sel::JUMP_INPUT,
                    value: &target,
                },
            )
            .await?;
        mitigator
            .guarded_interact(
                page,
                Interaction::Click {
                    selector: sel::SEARCH_BUTTON,
                },
            )
            .await?;
        mitigator
            .guarded_interact(
                page,
                Interaction::WaitVisible {
                    selector: sel::ROW_MARKER,
                },
            )
            .await?;

        let mut rows = Vec::with_capacity(conf.rows_per_page as usize);
        for index in 0..conf.rows_per_page as usize {
            match extract::extract_row(page, index).await {
                Ok(row) => rows.push(row),
                Err(CrawlError::ExtractionGap { index }) => {
                    log::debug!("lineage {}: page ends at row {index}", self.lineage);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let Some(last) = rows.last() else {
            return Ok(rows);
        };
        if stalled(&self.rank, &last.cb_rank) {
            return Err(CrawlError::RankStall {
                lineage: self.lineage.clone(),
                rank: self.rank.clone(),
            });
        }
        self.rank = last.cb_rank.clone();
        Ok(rows)
    }
}
