pub mod manager;
pub mod store;
pub mod types;

pub use manager::SessionManager;
pub use store::{SessionStore, SqliteSessionStore};
pub use types::InboundContext;
