use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("timed out after {timeout:?} waiting for `{selector}`")]
    WaitTimeout { selector: String, timeout: Duration },

    #[error("no element matching `{selector}` at index {index}")]
    MissingElement { selector: String, index: usize },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser session closed")]
    SessionClosed,

    #[error("engine error: {0}")]
    Engine(String),
}

impl PageError {
    /// Failures that look like an element never became actionable, i.e. the
    /// kind of failure an anti-bot interstitial produces.
    pub fn is_actionability(&self) -> bool {
        matches!(
            self,
            PageError::WaitTimeout { .. } | PageError::MissingElement { .. }
        )
    }
}
