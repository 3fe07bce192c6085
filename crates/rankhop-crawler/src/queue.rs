use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::Request;

/// Submission side of the shared request queue. Deduplicates on
/// `unique_key` so re-submitting an identical request is a no-op, and counts
/// accepted submissions so the scheduler can detect quiescence.
#[derive(Debug, Clone)]
pub struct RequestTx {
    tx: mpsc::UnboundedSender<Request>,
    seen: Arc<Mutex<HashSet<String>>>,
    submitted: Arc<AtomicUsize>,
}

pub type RequestRx = mpsc::UnboundedReceiver<Request>;

pub fn request_queue() -> (RequestTx, RequestRx) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RequestTx {
            tx,
            seen: Arc::new(Mutex::new(HashSet::new())),
            submitted: Arc::new(AtomicUsize::new(0)),
        },
        rx,
    )
}

impl RequestTx {
    /// Enqueue a request. Returns `false` when a request with the same
    /// `unique_key` was already submitted.
    pub fn send(&self, req: Request) -> bool {
        {
            let mut seen = self.seen.lock().expect("seen set poisoned");
            if !seen.insert(req.unique_key.clone()) {
                log::debug!("dropping duplicate request {}", req.unique_key);
                return false;
            }
        }
        self.push(req);
        true
    }

    /// Re-enqueue a failed request, bypassing deduplication. Retry is a
    /// scheduler-internal transition, not a new submission.
    pub(crate) fn resend(&self, req: Request) {
        self.push(req);
    }

    fn push(&self, req: Request) {
        match self.tx.send(req) {
            Ok(()) => {
                self.submitted.fetch_add(1, Ordering::SeqCst);
            }
            Err(e) => {
                log::error!("couldn't enqueue request: {e}");
            }
        }
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}
