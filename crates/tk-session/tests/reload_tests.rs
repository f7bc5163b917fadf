//! Simulated process restarts over a file-backed store.

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tk_session::{
    ExpiresAt, FileKvStore, KvStore, ManualClock, ManualTimer, SessionConfig, SessionManager,
    SessionState,
};

const T0: i64 = 1_700_000_000_000;

fn boot(path: &std::path::Path, clock: &Arc<ManualClock>) -> (SessionManager, Arc<ManualTimer>) {
    let store = Arc::new(FileKvStore::open(path).unwrap());
    let timer = Arc::new(ManualTimer::new(Arc::clone(clock)));
    let m = SessionManager::new(store, timer.clone(), clock.clone(), SessionConfig::default());
    (m, timer)
}

#[test]
fn test_login_survives_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("session.json");
    let clock = Arc::new(ManualClock::new(T0));

    {
        let (m, _timer) = boot(&path, &clock);
        assert_eq!(m.restore().unwrap(), SessionState::LoggedOut);
        m.login("tok", ExpiresAt::from_millis(T0 + 3_600_000)).unwrap();
    }

    let (m, _timer) = boot(&path, &clock);
    let state = m.restore().unwrap();
    assert_eq!(state.token(), Some("tok"));
    assert_eq!(state.expires_at(), Some(ExpiresAt::from_millis(T0 + 3_600_000)));
}

#[test]
fn test_logout_survives_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("session.json");
    let clock = Arc::new(ManualClock::new(T0));

    {
        let (m, _timer) = boot(&path, &clock);
        m.login("tok", ExpiresAt::from_millis(T0 + 3_600_000)).unwrap();
        m.logout().unwrap();
    }

    let store = FileKvStore::open(&path).unwrap();
    assert!(store.get("token").unwrap().is_none());
    assert!(store.get("expirationTime").unwrap().is_none());

    let (m, _timer) = boot(&path, &clock);
    assert!(!m.restore().unwrap().is_logged_in());
}

#[test]
fn test_reload_near_expiry_discards_session() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("session.json");
    let clock = Arc::new(ManualClock::new(T0));

    {
        let (m, _timer) = boot(&path, &clock);
        m.login("tok", ExpiresAt::from_millis(T0 + 90_000)).unwrap();
    }

    // Process was down for 45s; 45s of validity left is under a minute.
    clock.advance(Duration::from_secs(45));
    let (m, timer) = boot(&path, &clock);
    assert!(!m.restore().unwrap().is_logged_in());
    assert_eq!(timer.pending(), 0);
    assert!(FileKvStore::open(&path).unwrap().get("token").unwrap().is_none());
}

#[test]
fn test_restored_session_still_expires() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("session.json");
    let clock = Arc::new(ManualClock::new(T0));

    {
        let (m, _timer) = boot(&path, &clock);
        m.login("tok", ExpiresAt::from_millis(T0 + 300_000)).unwrap();
    }

    clock.advance(Duration::from_secs(100));
    let (m, timer) = boot(&path, &clock);
    assert!(m.restore().unwrap().is_logged_in());
    assert_eq!(m.remaining(), Some(Duration::from_secs(200)));

    timer.advance(Duration::from_secs(200));
    assert!(!m.is_logged_in());
    assert!(FileKvStore::open(&path).unwrap().get("token").unwrap().is_none());
}
