pub mod ambient;
pub mod base;
pub mod file_store;
pub mod memory_store;

// Re-export the primary store items so code outside can do
// "use crate::store::{SessionStore, create_session_store};"
pub use ambient::AmbientContext;
pub use base::{create_session_store, SessionStore, SessionUpdate};
pub use file_store::FileSessionStore;
pub use memory_store::MemorySessionStore;
