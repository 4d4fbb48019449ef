use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::profile::engine::ProfileEngine;

pub const DEFAULT_SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

struct SessionEntry {
    engine: Arc<ProfileEngine>,
    last_touched: Instant,
}

/// Open editing sessions, one engine each.
///
/// Sessions untouched for longer than the idle TTL are evicted lazily on the
/// next `open` or `get`.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_IDLE_TTL)
    }
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    pub async fn open(&self, engine: Arc<ProfileEngine>) -> Uuid {
        let session_id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);
        sessions.insert(
            session_id,
            SessionEntry {
                engine,
                last_touched: now,
            },
        );
        info!("Opened profile session {session_id}");
        session_id
    }

    /// Returns the session's engine and marks it as touched.
    pub async fn get(&self, session_id: Uuid) -> Option<Arc<ProfileEngine>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);
        let entry = sessions.get_mut(&session_id)?;
        entry.last_touched = now;
        Some(entry.engine.clone())
    }

    /// Drops the session. An in-flight save keeps its own handle and still completes.
    pub async fn close(&self, session_id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&session_id).is_some();
        if removed {
            info!("Closed profile session {session_id}");
        }
        removed
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_touched) <= self.idle_ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle profile session(s)");
        }
    }
}
