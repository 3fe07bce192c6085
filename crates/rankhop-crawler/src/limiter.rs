use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

/// Requests-per-minute admission gate. A background task tops the permit
/// pool back up to the configured budget once per minute window; admissions
/// consume permits without returning them, so at most `per_minute` requests
/// start within any window.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    per_minute: usize,
}

impl RateLimiter {
    pub fn per_minute(per_minute: usize) -> Self {
        let per_minute = per_minute.max(1);
        let permits = Arc::new(Semaphore::new(per_minute));

        let permits_c = permits.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(60));
            tick.tick().await; // immediate first tick, pool starts full
            loop {
                tick.tick().await;
                let available = permits_c.available_permits();
                permits_c.add_permits(per_minute.saturating_sub(available));
            }
        });

        Self {
            permits,
            per_minute,
        }
    }

    /// Wait at the admission gate until the current minute window has
    /// budget left, then consume one admission.
    pub async fn admit(&self) {
        match self.permits.acquire().await {
            Ok(permit) => permit.forget(),
            // The semaphore is never closed; treat it as an open gate.
            Err(_) => log::error!("rate limiter semaphore closed"),
        }
    }

    /// Non-blocking admission attempt.
    pub fn try_admit(&self) -> bool {
        match self.permits.try_acquire() {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_) => false,
        }
    }

    pub fn budget(&self) -> usize {
        self.per_minute
    }
}
