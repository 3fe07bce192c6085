use chrono::{DateTime, Utc};
use rand::Rng;

/// Identity of one crawl run, created at startup and passed to every
/// component that labels its output (sink spool, challenge samples).
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub dataset: String,
}

impl RunContext {
    pub fn new(dataset: impl Into<String>) -> Self {
        let started_at = Utc::now();
        let suffix: u32 = rand::thread_rng().gen_range(0x1000..0xffff);
        Self {
            run_id: format!("{}-{suffix:04x}", started_at.format("%Y%m%d%H%M%S")),
            started_at,
            dataset: dataset.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_distinct() {
        let a = RunContext::new("default");
        let b = RunContext::new("default");
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.dataset, "default");
    }
}
