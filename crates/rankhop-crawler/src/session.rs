use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// One remote-facing identity. Retired after `max_usage` fetches; with the
/// default `max_usage = 1` every request runs under a fresh identity.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    usage: u32,
    max_usage: u32,
}

impl Session {
    pub fn retired(&self) -> bool {
        self.usage >= self.max_usage
    }

    pub fn usage(&self) -> u32 {
        self.usage
    }
}

/// Issues and recycles sessions under the governor's usage limit.
#[derive(Debug)]
pub struct SessionPool {
    max_usage: u32,
    counter: AtomicU64,
    idle: Mutex<VecDeque<Session>>,
}

impl SessionPool {
    pub fn new(max_usage: u32) -> Self {
        Self {
            max_usage: max_usage.max(1),
            counter: AtomicU64::new(0),
            idle: Mutex::new(VecDeque::new()),
        }
    }

    /// Check out a usable session, minting a fresh one when none is idle.
    /// The fetch is counted immediately.
    pub fn checkout(&self) -> Session {
        let reused = {
            let mut idle = self.idle.lock().expect("session pool poisoned");
            idle.pop_front()
        };
        let mut session = reused.unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Session {
                id: format!("session-{n}"),
                usage: 0,
                max_usage: self.max_usage,
            }
        });
        session.usage += 1;
        session
    }

    /// Return a session after its request settles; retired sessions are
    /// dropped.
    pub fn give_back(&self, session: Session) {
        if session.retired() {
            log::debug!("retiring {} after {} uses", session.id, session.usage);
            return;
        }
        let mut idle = self.idle.lock().expect("session pool poisoned");
        idle.push_back(session);
    }
}
