//! Per-user conversation storage with idle expiry.
//!
//! The store owns every [`ConversationSession`]; no other component mutates
//! one directly. Expiry happens in two places with different outcomes:
//!
//! - lazily in [`ConversationStore::get_history`], which keeps the user entry
//!   but replaces its history with a fresh seed (a *silent reset* the caller
//!   can surface to the user), and
//! - in the background sweep, which deletes idle sessions outright.

use crate::message::Message;
use crate::prompt::{seed_history, system_context_message};
use chatcal_core::UserId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A single user's conversational state.
#[derive(Debug, Clone)]
struct ConversationSession {
    history: Vec<Message>,
    last_active: DateTime<Utc>,
}

impl ConversationSession {
    fn fresh() -> Self {
        Self {
            history: seed_history(),
            last_active: Utc::now(),
        }
    }

    fn idle_longer_than(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_active > lifetime
    }
}

/// How [`ConversationStore::get_history`] obtained the returned history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDisposition {
    /// The session already existed and was still live.
    Existing,
    /// No session existed; a fresh one was created.
    Created,
    /// The session had idled out and was silently reset to a fresh seed.
    /// Callers should notify the user exactly once per reset.
    Expired,
}

/// History returned by [`ConversationStore::get_history`].
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    /// The ordered message history at the time of the call.
    pub messages: Vec<Message>,
    /// How this history came to be.
    pub disposition: SessionDisposition,
}

/// Owns per-user message history and activity timestamps.
///
/// Shared between the request path and the sweep task; both may touch
/// different keys concurrently. No cross-entry invariant depends on anything
/// beyond single-key atomicity.
#[derive(Debug)]
pub struct ConversationStore {
    lifetime: Duration,
    sessions: RwLock<HashMap<UserId, ConversationSession>>,
    /// Per-user gates so two concurrent messages from one user cannot
    /// interleave their read/append cycles.
    gates: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationStore {
    /// Creates a store whose sessions expire after `lifetime` of inactivity.
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            sessions: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the user's history, creating or resetting the session as
    /// needed, and bumps `last_active`.
    ///
    /// For a live session only the system-context message (index 0) is
    /// regenerated, so its embedded timestamp stays current while the rest of
    /// the history is untouched.
    pub fn get_history(&self, user_id: UserId) -> HistorySnapshot {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();

        let (disposition, session) = match sessions.entry(user_id) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                info!(%user_id, "initialized fresh conversation");
                (SessionDisposition::Created, entry.insert(ConversationSession::fresh()))
            }
            std::collections::hash_map::Entry::Occupied(entry) => {
                let session = entry.into_mut();
                if session.idle_longer_than(self.lifetime, now) {
                    info!(%user_id, "conversation idled out, resetting history");
                    session.history = seed_history();
                    (SessionDisposition::Expired, session)
                } else {
                    session.history[0] = system_context_message();
                    (SessionDisposition::Existing, session)
                }
            }
        };

        session.last_active = now;
        HistorySnapshot {
            messages: session.history.clone(),
            disposition,
        }
    }

    /// Appends a message to the user's history and bumps `last_active`.
    ///
    /// If the session vanished between calls (a race with the sweep), the
    /// history is reinitialized with a fresh seed plus this message rather
    /// than failing.
    pub fn update_history(&self, user_id: UserId, message: Message) {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(&user_id) {
            Some(session) => {
                session.history.push(message);
                session.last_active = Utc::now();
            }
            None => {
                warn!(%user_id, "appending to a missing session, reinitializing");
                let mut session = ConversationSession::fresh();
                session.history.push(message);
                sessions.insert(user_id, session);
            }
        }
    }

    /// Unconditionally reinitializes the user's history with a fresh seed.
    pub fn reset_history(&self, user_id: UserId) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(user_id, ConversationSession::fresh());
        info!(%user_id, "conversation reset");
    }

    /// Deletes every session idle longer than the configured lifetime and
    /// returns how many were removed.
    ///
    /// Expiry is decided on a snapshot of activity timestamps and re-checked
    /// under the write lock, so a session touched mid-sweep survives.
    pub fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let candidates: Vec<UserId> = {
            let sessions = self.sessions.read().unwrap();
            sessions
                .iter()
                .filter(|(_, session)| session.idle_longer_than(self.lifetime, now))
                .map(|(user_id, _)| *user_id)
                .collect()
        };

        if candidates.is_empty() {
            return 0;
        }

        let mut removed = 0;
        let mut sessions = self.sessions.write().unwrap();
        for user_id in candidates {
            let still_expired = sessions
                .get(&user_id)
                .is_some_and(|session| session.idle_longer_than(self.lifetime, now));
            if still_expired {
                sessions.remove(&user_id);
                removed += 1;
                debug!(%user_id, "deleted idle conversation");
            }
        }
        drop(sessions);

        // Gates for deleted sessions are dropped once nothing holds them.
        let mut gates = self.gates.lock().unwrap();
        let sessions = self.sessions.read().unwrap();
        gates.retain(|user_id, gate| {
            sessions.contains_key(user_id) || Arc::strong_count(gate) > 1
        });

        removed
    }

    /// Returns the serialization gate for a user. Handlers lock it for the
    /// duration of one message so a user's messages are processed one at a
    /// time.
    #[must_use]
    pub fn user_gate(&self, user_id: UserId) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap();
        Arc::clone(
            gates
                .entry(user_id)
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Returns true if a session exists for the user.
    #[must_use]
    pub fn contains(&self, user_id: UserId) -> bool {
        self.sessions.read().unwrap().contains_key(&user_id)
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Returns whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().unwrap().is_empty()
    }

    /// Spawns the periodic sweep task.
    ///
    /// The returned [`SweepTask`] must be shut down during process teardown
    /// so no sweep iteration is left partially applied.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration) -> SweepTask {
        let store = Arc::clone(self);
        let shutdown = Arc::new(Notify::new());
        let shutdown_signal = Arc::clone(&shutdown);

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + every;
            let mut interval = tokio::time::interval_at(start, every);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = store.sweep_expired();
                        if removed > 0 {
                            debug!(removed, "periodic conversation sweep");
                        }
                    }
                    _ = shutdown_signal.notified() => break,
                }
            }
        });

        SweepTask { shutdown, handle }
    }
}

/// Handle to the background sweep task.
#[derive(Debug)]
pub struct SweepTask {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Signals the sweep loop to stop and waits for it to finish. A sweep
    /// iteration in progress completes before the task exits.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "sweep task did not shut down cleanly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(n: i64) -> UserId {
        UserId::new(n)
    }

    #[test]
    fn fresh_session_seeds_context_pair() {
        let store = ConversationStore::new(Duration::minutes(30));
        let snapshot = store.get_history(user(1));

        assert_eq!(snapshot.disposition, SessionDisposition::Created);
        assert_eq!(snapshot.messages.len(), 2);
    }

    #[test]
    fn live_session_regenerates_only_system_context() {
        let store = ConversationStore::new(Duration::minutes(30));
        let first = store.get_history(user(1));
        store.update_history(user(1), Message::user("hello"));
        std::thread::sleep(std::time::Duration::from_micros(5));

        let second = store.get_history(user(1));
        assert_eq!(second.disposition, SessionDisposition::Existing);
        assert_eq!(second.messages.len(), 3);
        // Index 0 regenerated with a fresh timestamp, the rest untouched.
        assert_ne!(first.messages[0].text(), second.messages[0].text());
        assert_eq!(second.messages[2].text(), Some("hello"));
    }

    #[test]
    fn idle_session_silently_resets() {
        let store = ConversationStore::new(Duration::zero());
        store.get_history(user(1));
        store.update_history(user(1), Message::user("hello"));
        store.update_history(user(1), Message::model("hi!"));

        std::thread::sleep(std::time::Duration::from_millis(5));

        let snapshot = store.get_history(user(1));
        assert_eq!(snapshot.disposition, SessionDisposition::Expired);
        assert_eq!(snapshot.messages.len(), 2);
    }

    #[test]
    fn update_after_sweep_reinitializes() {
        let store = ConversationStore::new(Duration::minutes(30));
        store.update_history(user(1), Message::user("hello"));

        let snapshot = store.get_history(user(1));
        // Seed pair plus the appended message.
        assert_eq!(snapshot.messages.len(), 3);
        assert_eq!(snapshot.messages[2].text(), Some("hello"));
    }

    #[test]
    fn sweep_deletes_idle_and_keeps_active() {
        let store = ConversationStore::new(Duration::milliseconds(50));
        store.get_history(user(1));
        std::thread::sleep(std::time::Duration::from_millis(80));
        store.get_history(user(2));

        let removed = store.sweep_expired();
        assert_eq!(removed, 1);
        assert!(!store.contains(user(1)));
        assert!(store.contains(user(2)));
    }

    #[test]
    fn sweep_on_empty_store_is_noop() {
        let store = ConversationStore::new(Duration::zero());
        assert_eq!(store.sweep_expired(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn reset_is_idempotent_with_fresh_context() {
        let store = ConversationStore::new(Duration::minutes(30));
        store.update_history(user(1), Message::user("hello"));

        store.reset_history(user(1));
        let first = store.get_history(user(1));
        std::thread::sleep(std::time::Duration::from_micros(5));
        store.reset_history(user(1));
        let second = store.get_history(user(1));

        assert_eq!(first.messages.len(), 2);
        assert_eq!(second.messages.len(), 2);
        assert_ne!(first.messages[0].text(), second.messages[0].text());
    }

    #[test]
    fn user_gate_is_stable_per_user() {
        let store = ConversationStore::new(Duration::minutes(30));
        let a = store.user_gate(user(1));
        let b = store.user_gate(user(1));
        assert!(Arc::ptr_eq(&a, &b));

        let other = store.user_gate(user(2));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn sweeper_runs_and_shuts_down() {
        let store = Arc::new(ConversationStore::new(Duration::milliseconds(10)));
        store.get_history(user(1));

        let sweeper = store.spawn_sweeper(std::time::Duration::from_millis(20));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert!(store.is_empty());
        sweeper.shutdown().await;
    }
}
