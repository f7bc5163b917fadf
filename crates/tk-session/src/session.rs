use serde::{Deserialize, Serialize};
use std::fmt;
use tk_core::ExpiresAt;

/// An authenticated session: an opaque token and when it stops being valid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub expires_at: ExpiresAt,
}

impl Session {
    pub fn new(token: impl Into<String>, expires_at: ExpiresAt) -> Self {
        Self { token: token.into(), expires_at }
    }
}

// Token is a credential; keep it out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &format_args!("<{} bytes>", self.token.len()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What observers see.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    LoggedOut,
    LoggedIn(Session),
}

impl SessionState {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, SessionState::LoggedIn(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::LoggedIn(s) => Some(s),
            SessionState::LoggedOut => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.session().map(|s| s.token.as_str())
    }

    pub fn expires_at(&self) -> Option<ExpiresAt> {
        self.session().map(|s| s.expires_at)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::LoggedOut => write!(f, "logged out"),
            SessionState::LoggedIn(s) => write!(f, "logged in until {}", s.expires_at),
        }
    }
}
