//! Message Router (spec §4.3): the thin seam between a channel transport and
//! the Session Manager. Grounded on the shape of the grounding codebase's
//! channel-to-session bridging, reduced to the two operations the
//! specification names and nothing else — it owns no session state itself.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::event_bus::{AppEvent, EventBus};
use crate::model::Message;
use crate::session::{InboundContext, SessionManager};

const OUTBOUND_DEDUP_WINDOW: Duration = Duration::from_secs(5);

/// Routes inbound channel traffic into sessions and outbound replies onto
/// the Event Bus, applying the spec's best-effort outbound de-duplication.
pub struct MessageRouter {
    sessions: Arc<SessionManager>,
    bus: Arc<EventBus>,
    last_outbound: RwLock<HashMap<String, Instant>>,
}

impl MessageRouter {
    pub fn new(sessions: Arc<SessionManager>, bus: Arc<EventBus>) -> Self {
        Self {
            sessions,
            bus,
            last_outbound: RwLock::new(HashMap::new()),
        }
    }

    /// spec §4.3 `handleInbound(msg)`. Returns the session id the message
    /// was appended to.
    pub fn handle_inbound(&self, ctx: &InboundContext, text: impl Into<String>) -> String {
        let session = self.sessions.resolve(ctx);
        let message = Message::user_on_channel(text.into(), ctx.channel.clone());
        let _ = self.sessions.append_message(&session.id, message.clone());
        self.bus.publish(AppEvent::MessageInbound {
            session_id: session.id.clone(),
            message,
        });
        session.id
    }

    /// spec §4.3 `handleOutbound(sessionId, text)`. Returns `false` (and
    /// emits nothing) when another outbound for this session landed within
    /// the last 5 seconds; this is an optimization, not a correctness
    /// property (spec §8 "Idempotency is best-effort").
    pub fn handle_outbound(&self, session_id: &str, text: impl Into<String>) -> bool {
        {
            let mut last = self.last_outbound.write().expect("outbound dedup lock poisoned");
            if let Some(at) = last.get(session_id) {
                if at.elapsed() < OUTBOUND_DEDUP_WINDOW {
                    return false;
                }
            }
            last.insert(session_id.to_string(), Instant::now());
        }

        let channel = self.sessions.get(session_id).map(|s| s.channel.clone());
        let mut message = Message::assistant(text.into());
        message.channel = channel;
        self.bus.publish(AppEvent::MessageOutbound {
            session_id: session_id.to_string(),
            message,
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SqliteSessionStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    fn router() -> MessageRouter {
        let store: Arc<dyn crate::session::SessionStore> = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(store, bus.clone(), StdDuration::from_secs(3600));
        MessageRouter::new(sessions, bus)
    }

    #[tokio::test]
    async fn handle_inbound_appends_user_message_and_emits_event() {
        let r = router();
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        r.bus.subscribe("message.inbound", Box::new(move |_| { s.fetch_add(1, Ordering::SeqCst); }));

        let ctx = InboundContext::dm("cli", "u1");
        let session_id = r.handle_inbound(&ctx, "hello");

        let session = r.sessions.get(&session_id).unwrap();
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "hello");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handle_outbound_suppresses_second_send_within_window() {
        let r = router();
        let ctx = InboundContext::dm("cli", "u1");
        let session_id = r.handle_inbound(&ctx, "hi");

        assert!(r.handle_outbound(&session_id, "reply one"));
        assert!(!r.handle_outbound(&session_id, "reply two"));
    }

    #[tokio::test]
    async fn handle_outbound_never_appends_to_session_history() {
        let r = router();
        let ctx = InboundContext::dm("cli", "u1");
        let session_id = r.handle_inbound(&ctx, "hi");
        r.handle_outbound(&session_id, "reply");
        assert_eq!(r.sessions.get(&session_id).unwrap().messages.len(), 1);
    }
}
