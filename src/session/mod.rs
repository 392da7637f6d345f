pub mod context;
pub mod guard;
pub mod store;

pub use context::ChatSession;
pub use guard::{ChatGuard, lock_chat, lock_existing};
pub use store::{MemorySessionStore, SessionStore};
