//! Persistence contract for conversation sessions plus two interchangeable
//! backends: one JSON document per session on disk, and an in-memory map.

mod error;
mod memory;
mod paths;
mod schema;
mod store;
mod title;

pub use error::SessionStoreError;
pub use memory::MemorySessionStore;
pub use paths::{session_file_name, session_root};
pub use schema::{next_last_updated, Session, SessionDocument, SCHEMA_VERSION};
pub use store::{FileSessionStore, SessionStore};
pub use title::{derive_title, DEFAULT_TITLE, TITLE_MAX_CHARS};
