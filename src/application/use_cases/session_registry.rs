use crate::application::use_cases::data_qa_agent::DataQaAgent;
use crate::application::use_cases::session_controller::SessionController;
use crate::domain::llm_config::Credential;
use crate::infrastructure::csv::CsvParser;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};
use uuid::Uuid;

pub type SharedSession = Arc<AsyncMutex<SessionController>>;

struct SessionSlot {
    controller: SharedSession,
    last_seen: DateTime<Utc>,
}

/// Owns every live session. Each controller is created empty on first
/// contact and dropped, with its log, on `end` or after the idle timeout.
pub struct SessionRegistry {
    agent: Arc<dyn DataQaAgent + Send + Sync>,
    credential: Option<Credential>,
    parser: CsvParser,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<Uuid, SessionSlot>>,
}

impl SessionRegistry {
    pub fn new(
        agent: Arc<dyn DataQaAgent + Send + Sync>,
        credential: Option<Credential>,
        parser: CsvParser,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            agent,
            credential,
            parser,
            idle_timeout,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Look up `id`, or start a new session when it is missing or expired.
    /// The returned flag is true for a new session.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession, bool) {
        self.get_or_create_at(id, Utc::now())
    }

    fn get_or_create_at(&self, id: Option<Uuid>, now: DateTime<Utc>) -> (Uuid, SharedSession, bool) {
        let mut sessions = self.lock();
        self.evict_idle(&mut sessions, now);

        if let Some(id) = id {
            if let Some(slot) = sessions.get_mut(&id) {
                slot.last_seen = now;
                return (id, slot.controller.clone(), false);
            }
        }

        let id = Uuid::new_v4();
        let controller = Arc::new(AsyncMutex::new(SessionController::new(
            self.agent.clone(),
            self.credential.clone(),
            self.parser,
        )));
        sessions.insert(
            id,
            SessionSlot {
                controller: controller.clone(),
                last_seen: now,
            },
        );
        info!(session_id = %id, active = sessions.len(), "Session started");

        (id, controller, true)
    }

    /// Drop a session and its conversation log.
    pub fn end(&self, id: Uuid) -> bool {
        let removed = self.lock().remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionSlot>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, slot| now - slot.last_seen < self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionSlot>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
