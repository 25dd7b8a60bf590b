//! Session Manager: lifecycle, idle timers, and the sender/group index
//! (spec §4.2). Grounded on the shape of the grounding codebase's
//! `SessionRouter` (key resolution + in-memory map), extended with an
//! explicit [`SessionState`] machine, store-backed `resume`, `persist_all`,
//! and per-session idle timers — none of which the grounding codebase has.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::error::SessionError;
use crate::event_bus::{AppEvent, EventBus};
use crate::model::{Message, Session, SessionState};

use super::store::SessionStore;
use super::types::InboundContext;

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    sender_index: RwLock<HashMap<String, String>>,
    group_index: RwLock<HashMap<String, String>>,
    generations: RwLock<HashMap<String, u64>>,
    /// Per-session async lock a turn holds for its full duration, enforcing
    /// the "exclusive write access from thinking to done/error" ordering
    /// guarantee (spec §5).
    turn_locks: RwLock<HashMap<String, Arc<AsyncMutex<()>>>>,
    store: Arc<dyn SessionStore>,
    bus: Arc<EventBus>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, bus: Arc<EventBus>, idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            sender_index: RwLock::new(HashMap::new()),
            group_index: RwLock::new(HashMap::new()),
            generations: RwLock::new(HashMap::new()),
            turn_locks: RwLock::new(HashMap::new()),
            store,
            bus,
            idle_timeout,
        })
    }

    /// spec §4.2 `resolve(inbound)`.
    pub fn resolve(self: &Arc<Self>, ctx: &InboundContext) -> Session {
        let key = ctx.index_key().to_string();
        let index = if ctx.is_group { &self.group_index } else { &self.sender_index };

        let existing_id = index.read().expect("index lock poisoned").get(&key).cloned();
        if let Some(id) = existing_id {
            let state = self.sessions.read().expect("session lock poisoned").get(&id).map(|s| s.state);
            match state {
                Some(SessionState::Idle) => {
                    if let Ok(session) = self.resume(&id) {
                        return session;
                    }
                }
                Some(_) => {
                    self.activate(&id);
                    if let Some(session) = self.sessions.read().expect("session lock poisoned").get(&id).cloned() {
                        return session;
                    }
                }
                None => {
                    if let Ok(session) = self.resume(&id) {
                        return session;
                    }
                }
            }
        }

        self.create(ctx, &key)
    }

    fn create(self: &Arc<Self>, ctx: &InboundContext, index_key: &str) -> Session {
        let id = format!("sess-{}", Uuid::new_v4());
        let session = Session::new(id.clone(), ctx.sender_id.clone(), ctx.channel.clone());

        self.sessions.write().expect("session lock poisoned").insert(id.clone(), session.clone());
        let index = if ctx.is_group { &self.group_index } else { &self.sender_index };
        index.write().expect("index lock poisoned").insert(index_key.to_string(), id.clone());

        self.bus.publish(AppEvent::SessionCreated { session_id: id.clone() });
        self.activate(&id);
        self.sessions.read().expect("session lock poisoned").get(&id).cloned().unwrap_or(session)
    }

    /// spec §4.2 `activate(session)`.
    pub fn activate(self: &Arc<Self>, id: &str) {
        let now = chrono::Utc::now();
        {
            let mut sessions = self.sessions.write().expect("session lock poisoned");
            if let Some(session) = sessions.get_mut(id) {
                session.state = SessionState::Active;
                session.last_active = now;
            }
        }
        let generation = {
            let mut generations = self.generations.write().expect("generation lock poisoned");
            let r#gen = generations.entry(id.to_string()).or_insert(0);
            *r#gen += 1;
            *r#gen
        };
        self.rearm_idle_timer(id.to_string(), generation);
    }

    fn rearm_idle_timer(self: &Arc<Self>, id: String, generation: u64) {
        let manager = Arc::clone(self);
        let timeout = self.idle_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let current = manager
                .generations
                .read()
                .expect("generation lock poisoned")
                .get(&id)
                .copied()
                .unwrap_or(0);
            if current == generation {
                manager.idle(&id);
            }
        });
    }

    /// spec §4.2 `idle(sessionId)`. Idempotent.
    pub fn idle(&self, id: &str) {
        let already_idle = {
            let mut sessions = self.sessions.write().expect("session lock poisoned");
            match sessions.get_mut(id) {
                Some(session) if session.state != SessionState::Idle => {
                    session.state = SessionState::Idle;
                    false
                }
                Some(_) => true,
                None => return,
            }
        };
        if already_idle {
            return;
        }
        if let Some(session) = self.sessions.read().expect("session lock poisoned").get(id).cloned() {
            if let Err(e) = self.store.save(&session) {
                log::warn!("session_manager: failed to persist session {id} on idle: {e}");
            }
        }
        self.bus.publish(AppEvent::SessionIdle { session_id: id.to_string() });
    }

    /// spec §4.2 `resume(sessionId)`.
    pub fn resume(self: &Arc<Self>, id: &str) -> Result<Session, SessionError> {
        let in_memory = self.sessions.read().expect("session lock poisoned").contains_key(id);
        if in_memory {
            self.activate(id);
            return Ok(self.sessions.read().expect("session lock poisoned").get(id).cloned().unwrap());
        }

        let loaded = self.store.load(id)?;
        self.sessions.write().expect("session lock poisoned").insert(id.to_string(), loaded);
        self.activate(id);
        self.bus.publish(AppEvent::SessionResumed { session_id: id.to_string() });
        Ok(self.sessions.read().expect("session lock poisoned").get(id).cloned().unwrap())
    }

    /// spec §4.2 `persistAll()`.
    pub fn persist_all(&self) {
        let sessions: Vec<Session> = self.sessions.read().expect("session lock poisoned").values().cloned().collect();
        for session in sessions {
            if let Err(e) = self.store.save(&session) {
                log::warn!("session_manager: failed to persist session {}: {e}", session.id);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().expect("session lock poisoned").get(id).cloned()
    }

    /// Append a message to a session's live history, refreshing `last_active`.
    pub fn append_message(&self, id: &str, message: Message) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.push(message);
        Ok(())
    }

    pub fn replace_messages(&self, id: &str, messages: Vec<Message>, summary: String) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.messages = messages;
        session.summary = summary;
        Ok(())
    }

    /// The async lock an Agent Loop turn holds for its full duration so a
    /// second inbound message for the same session queues behind it
    /// (spec §5 ordering guarantee).
    pub fn turn_lock(&self, id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.turn_locks.write().expect("turn lock map poisoned");
        Arc::clone(locks.entry(id.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(()))))
    }
}
