use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::flows::states::Session;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

struct Entry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// In-memory sessions keyed by transport identity. Each session sits behind its
/// own lock: turns of one session run one at a time while distinct sessions
/// proceed in parallel. Nothing survives a restart.
///
/// A session is dropped as soon as a turn leaves it at an empty root, or once
/// it has been idle for longer than the idle timeout.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self { sessions: Mutex::new(HashMap::new()), idle_timeout }
    }

    /// Returns the session for `id`, creating an empty one on first contact.
    pub fn session(&self, id: &str) -> Arc<Mutex<Session>> {
        let mut sessions = lock(&self.sessions);
        let entry = sessions.entry(id.to_owned()).or_insert_with(|| Entry {
            session: Arc::new(Mutex::new(Session::new(id))),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        Arc::clone(&entry.session)
    }

    /// Forgets `id` if its session is back at an empty root and no other
    /// request holds it. Call after dropping the handle from [`Self::session`].
    pub fn release(&self, id: &str) -> bool {
        let mut sessions = lock(&self.sessions);
        let idle_at_root = sessions.get(id).is_some_and(|entry| {
            Arc::strong_count(&entry.session) == 1 && lock(&entry.session).is_at_root()
        });
        if idle_at_root {
            sessions.remove(id);
        }
        idle_at_root
    }

    /// Drops sessions not touched since `now - idle_timeout`. Returns how many
    /// were evicted.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let expired = now.saturating_duration_since(entry.last_seen) >= self.idle_timeout;
            !expired || Arc::strong_count(&entry.session) > 1
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Locks a session, recovering it if a previous holder panicked.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
