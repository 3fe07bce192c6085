use std::time::Duration;

use rankhop_page::PageError;

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Element not actionable within its budget. Recoverable once through
    /// the challenge mitigation fallback.
    #[error("interaction with `{selector}` timed out after {timeout:?}")]
    InteractionTimeout { selector: String, timeout: Duration },

    /// Expected row region absent.
    #[error("row {index} is missing its rank region")]
    ExtractionGap { index: usize },

    /// Cursor failed to advance; fatal to the lineage.
    #[error("lineage {lineage} stalled at rank {rank}")]
    RankStall { lineage: String, rank: String },

    /// An overlay challenge survived the mitigation fallback; the remote is
    /// throttling input.
    #[error("remote rate limiting detected on `{selector}`")]
    RateLimited { selector: String },

    /// A full-page interstitial survived the mitigation fallback.
    #[error("session blocked by remote on `{selector}`")]
    Blocked { selector: String },

    #[error("request handler exceeded its {0:?} budget")]
    RequestTimeout(Duration),

    #[error("malformed request label `{0}`")]
    InvalidLabel(String),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CrawlError {
    /// Governor-level failures that warrant backing off and rotating
    /// identity before the next attempt, rather than plain re-dispatch.
    pub fn wants_backoff(&self) -> bool {
        matches!(
            self,
            CrawlError::RateLimited { .. } | CrawlError::Blocked { .. }
        )
    }
}
