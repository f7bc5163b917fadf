//! Client-side session holder: keeps an auth token and its expiry, persists
//! them across restarts, and logs out automatically when the token expires.

pub mod manager;
pub mod session;
pub mod timer;

pub use manager::SessionManager;
pub use session::{Session, SessionState};
pub use timer::{ManualTimer, TimerCallback, TimerFacility, TimerHandle, TokioTimer};

pub use tk_core::{Clock, ExpiresAt, ManualClock, SessionConfig, SystemClock, TkError};
pub use tk_storage::{FileKvStore, KvStore, MemoryKvStore};
