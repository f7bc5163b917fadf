//! Persistence adapters for session state.
//!
//! Both stores are synchronous: the session manager needs the persisted
//! state the moment it is asked to restore.

pub mod file_store;
pub mod kv;

pub use file_store::FileKvStore;
pub use kv::{KvStore, MemoryKvStore};
