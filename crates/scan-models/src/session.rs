use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A monotonically increasing session id. At most one session is active at
/// a time; the id only ever increases.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: AtomicU64,
    active: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: AtomicU64::new(0),
                active: AtomicBool::new(false),
            }),
        }
    }

    /// Increments the session id and marks the session active. Returns the
    /// new id so callers can stamp in-flight work with it.
    pub fn start(&self) -> u64 {
        let id = self.inner.id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.active.store(true, Ordering::SeqCst);
        id
    }

    /// Clears the active flag but preserves the current id, so in-flight
    /// callbacks captured before the stop can still self-cancel.
    pub fn stop(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
    }

    pub fn current_id(&self) -> u64 {
        self.inner.id.load(Ordering::SeqCst)
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn is_valid(&self, id: u64) -> bool {
        self.is_active() && id == self.current_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_increments_and_activates() {
        let session = Session::new();
        assert!(!session.is_active());
        let id1 = session.start();
        assert_eq!(id1, 1);
        assert!(session.is_active());
        let id2 = session.start();
        assert_eq!(id2, 2);
    }

    #[test]
    fn stop_preserves_id_but_invalidates_callbacks() {
        let session = Session::new();
        let id = session.start();
        session.stop();
        assert!(!session.is_active());
        assert_eq!(session.current_id(), id);
        assert!(!session.is_valid(id));
    }

    #[test]
    fn stale_id_is_never_valid_after_restart() {
        let session = Session::new();
        let stale = session.start();
        session.stop();
        let fresh = session.start();
        assert_ne!(stale, fresh);
        assert!(!session.is_valid(stale));
        assert!(session.is_valid(fresh));
    }
}
