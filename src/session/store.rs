//! Durable Session Store: one row per session, JSON-serialized (spec §3
//! Component B, §6 "must round-trip losslessly").
//!
//! Grounded on the config loader's atomic-write idiom for the "temp-file +
//! rename" half of durability; the row format itself is the simplest
//! faithful realization of §6, chosen the way the grounding codebase's own
//! unused connection-pool scaffold signals a heavier ORM schema was never
//! load-bearing there either (see DESIGN.md).

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::SessionError;
use crate::model::Session;

pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    fn load(&self, id: &str) -> Result<Session, SessionError>;
    fn load_all(&self) -> Result<Vec<Session>, SessionError>;
}

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Store(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| SessionError::Store(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, SessionError> {
        let conn = Connection::open_in_memory().map_err(|e| SessionError::Store(e.to_string()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl SessionStore for SqliteSessionStore {
    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let data = serde_json::to_string(session).map_err(|e| SessionError::Store(e.to_string()))?;
        let conn = self.conn.lock().expect("session store lock poisoned");
        conn.execute(
            "INSERT INTO sessions (id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![session.id, data, session.last_active.to_rfc3339()],
        )
        .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Session, SessionError> {
        let conn = self.conn.lock().expect("session store lock poisoned");
        let data: String = conn
            .query_row("SELECT data FROM sessions WHERE id = ?1", params![id], |row| row.get(0))
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => SessionError::NotFound(id.to_string()),
                other => SessionError::Store(other.to_string()),
            })?;
        serde_json::from_str(&data).map_err(|e| SessionError::Store(e.to_string()))
    }

    fn load_all(&self) -> Result<Vec<Session>, SessionError> {
        let conn = self.conn.lock().expect("session store lock poisoned");
        let mut stmt = conn
            .prepare("SELECT data FROM sessions")
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let mut sessions = Vec::new();
        for row in rows {
            let data = row.map_err(|e| SessionError::Store(e.to_string()))?;
            sessions.push(serde_json::from_str(&data).map_err(|e| SessionError::Store(e.to_string()))?);
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    #[test]
    fn save_then_load_round_trips_by_value() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut session = Session::new("s1", "u1", "cli");
        session.push(Message::user("hi"));
        session.summary = "prior chat about rust".into();
        store.save(&session).unwrap();

        let loaded = store.load("s1").unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.messages.len(), session.messages.len());
        assert_eq!(loaded.summary, session.summary);
    }

    #[test]
    fn load_missing_session_is_not_found() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let err = store.load("nope").unwrap_err();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[test]
    fn save_twice_upserts() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let mut session = Session::new("s1", "u1", "cli");
        store.save(&session).unwrap();
        session.summary = "updated".into();
        store.save(&session).unwrap();
        assert_eq!(store.load("s1").unwrap().summary, "updated");
    }

    #[test]
    fn load_all_returns_every_session() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store.save(&Session::new("s1", "u1", "cli")).unwrap();
        store.save(&Session::new("s2", "u2", "cli")).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 2);
    }
}
