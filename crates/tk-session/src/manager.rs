//! Token lifecycle: login, logout, restore on startup and auto-logout on expiry.

use crate::session::{Session, SessionState};
use crate::timer::{TimerFacility, TimerHandle};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tk_core::{Clock, ExpiresAt, Result, SessionConfig, SystemClock, TkError};
use tk_storage::KvStore;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Owns the current session and its single expiry timer.
///
/// Cloning yields another handle to the same session, so the manager can be
/// handed to every consumer that needs the token or login state.
#[derive(Clone)]
pub struct SessionManager {
    shared: Arc<Shared>,
}

struct Shared {
    store: Arc<dyn KvStore>,
    timer: Arc<dyn TimerFacility>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    timers: Mutex<TimerSlot>,
    state: watch::Sender<SessionState>,
}

#[derive(Default)]
struct TimerSlot {
    pending: Option<TimerHandle>,
    /// Bumped whenever the pending timer is replaced or dropped; a callback
    /// only acts if it still carries the current value.
    generation: u64,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn KvStore>,
        timer: Arc<dyn TimerFacility>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            shared: Arc::new(Shared {
                store,
                timer,
                clock,
                config,
                timers: Mutex::new(TimerSlot::default()),
                state,
            }),
        }
    }

    /// Wall clock and default keys/grace window.
    pub fn with_defaults(store: Arc<dyn KvStore>, timer: Arc<dyn TimerFacility>) -> Self {
        Self::new(store, timer, Arc::new(SystemClock), SessionConfig::default())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// Start a session. An already-expired `expires_at` is accepted and
    /// logs out as soon as the timer facility gets to it.
    pub fn login(&self, token: impl Into<String>, expires_at: impl Into<ExpiresAt>) -> Result<()> {
        let token = token.into();
        if token.is_empty() {
            return Err(TkError::EmptyToken);
        }
        let expires_at = expires_at.into();
        let shared = &self.shared;
        let mut slot = shared.timers.lock();

        if let Err(e) = shared.persist(&token, expires_at) {
            shared.rollback_persisted();
            return Err(e);
        }

        let now = shared.clock.now_ms();
        let remaining_ms = expires_at.remaining_ms(now);
        Shared::arm(shared, &mut slot, expires_at.delay_from(now));
        info!(token_len = token.len(), %expires_at, remaining_ms, "session started");
        shared.publish(SessionState::LoggedIn(Session::new(token, expires_at)));
        Ok(())
    }

    /// [`login`](Self::login) with a lifetime relative to now.
    pub fn login_for(&self, token: impl Into<String>, lifetime: Duration) -> Result<()> {
        let expires_at = ExpiresAt::after(self.shared.clock.now_ms(), lifetime);
        self.login(token, expires_at)
    }

    /// End the session. Calling it while logged out only re-clears the store.
    pub fn logout(&self) -> Result<()> {
        let shared = &self.shared;
        let mut slot = shared.timers.lock();
        shared.disarm(&mut slot);
        if shared.publish(SessionState::LoggedOut) {
            info!("session ended");
        }
        shared.clear_persisted()
    }

    /// Load the persisted session, if one is still usable.
    ///
    /// Anything missing, malformed, or expiring within the grace window is
    /// wiped from the store and yields [`SessionState::LoggedOut`].
    pub fn restore(&self) -> Result<SessionState> {
        let shared = &self.shared;
        let mut slot = shared.timers.lock();

        let now = shared.clock.now_ms();
        match shared.read_persisted(now)? {
            Some(session) => {
                let remaining_ms = session.expires_at.remaining_ms(now);
                Shared::arm(shared, &mut slot, session.expires_at.delay_from(now));
                info!(expires_at = %session.expires_at, remaining_ms, "session restored");
                shared.publish(SessionState::LoggedIn(session));
            }
            None => {
                shared.disarm(&mut slot);
                shared.publish(SessionState::LoggedOut);
                shared.clear_persisted()?;
            }
        }
        Ok(shared.state.borrow().clone())
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.shared.state.borrow().token().map(str::to_string)
    }

    pub fn is_logged_in(&self) -> bool {
        self.shared.state.borrow().is_logged_in()
    }

    pub fn expires_at(&self) -> Option<ExpiresAt> {
        self.shared.state.borrow().expires_at()
    }

    /// Validity left on the current token; zero once past expiry.
    pub fn remaining(&self) -> Option<Duration> {
        let now = self.shared.clock.now_ms();
        self.expires_at().map(|e| e.delay_from(now))
    }

    /// Receiver that is marked changed whenever the state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }
}

impl Shared {
    /// Replace any pending timer with one that expires the session after `delay`.
    fn arm(this: &Arc<Self>, slot: &mut TimerSlot, delay: Duration) {
        this.disarm(slot);
        let generation = slot.generation;
        let weak: Weak<Self> = Arc::downgrade(this);
        let handle = this.timer.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.expire(generation);
                }
            }),
        );
        debug!(generation, delay_ms = delay.as_millis() as u64, "expiry timer armed");
        slot.pending = Some(handle);
    }

    fn disarm(&self, slot: &mut TimerSlot) {
        slot.generation = slot.generation.wrapping_add(1);
        if let Some(handle) = slot.pending.take() {
            self.timer.cancel(handle);
            debug!("expiry timer cancelled");
        }
    }

    fn expire(&self, generation: u64) {
        let mut slot = self.timers.lock();
        if slot.generation != generation {
            debug!(generation, current = slot.generation, "ignoring superseded expiry timer");
            return;
        }
        // This callback is the pending timer; nothing left to cancel.
        slot.pending = None;
        slot.generation = slot.generation.wrapping_add(1);
        if self.publish(SessionState::LoggedOut) {
            info!("session expired, logged out");
        }
        if let Err(e) = self.clear_persisted() {
            warn!(error = %e, "failed to clear persisted session after expiry");
        }
    }

    /// `None` when nothing usable is persisted.
    fn read_persisted(&self, now: i64) -> Result<Option<Session>> {
        let token = self
            .store
            .get(&self.config.token_key)?
            .filter(|t| !t.is_empty());
        let Some(token) = token else {
            debug!("no persisted token");
            return Ok(None);
        };
        let Some(raw_expiry) = self.store.get(&self.config.expiry_key)? else {
            debug!("persisted token has no expiry, discarding");
            return Ok(None);
        };
        let Ok(expires_at) = raw_expiry.parse::<ExpiresAt>() else {
            debug!(raw = %raw_expiry, "malformed persisted expiry, discarding");
            return Ok(None);
        };
        let remaining_ms = expires_at.remaining_ms(now);
        let grace = i64::try_from(self.config.grace_window_ms).unwrap_or(i64::MAX);
        if remaining_ms <= grace {
            debug!(remaining_ms, grace_ms = grace, "persisted session inside grace window, discarding");
            return Ok(None);
        }
        Ok(Some(Session::new(token, expires_at)))
    }

    /// Expiry first: a token is never persisted without its own expiry.
    fn persist(&self, token: &str, expires_at: ExpiresAt) -> Result<()> {
        self.store.set(&self.config.expiry_key, &expires_at.to_string())?;
        self.store.set(&self.config.token_key, token)
    }

    /// Put the store back in line with the in-memory session after a failed write.
    fn rollback_persisted(&self) {
        let current = self.state.borrow().session().cloned();
        let result = match current {
            Some(session) => self.persist(&session.token, session.expires_at),
            None => self.clear_persisted(),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to roll back persisted session after login error");
        }
    }

    /// Both keys are attempted; the first failure is returned.
    fn clear_persisted(&self) -> Result<()> {
        let token = self.store.remove(&self.config.token_key);
        let expiry = self.store.remove(&self.config.expiry_key);
        token.and(expiry)
    }

    /// Returns whether observers were notified.
    fn publish(&self, next: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.timers.get_mut().pending.take() {
            self.timer.cancel(handle);
        }
    }
}
