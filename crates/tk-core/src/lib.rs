//! Shared types for tokenkeeper: errors, configuration, timestamps and clocks.

pub mod clock;
pub mod config;
pub mod error;
pub mod expiry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{Result, TkError};
pub use expiry::ExpiresAt;
