//! Session store — bounded dialogue memory and mute latch per customer.
//!
//! Each customer id maps to its own `Arc<Mutex<Session>>`; the outer map
//! lock is held only to look up or create the entry, so operations for
//! different customers never block one another while operations for one
//! customer are linearized.

use dukkan_core::context::ContextEntry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Per-customer conversational state.
///
/// History is bounded at `2 * max_turn_pairs` entries; the oldest pair is
/// evicted first. The mute flag is monotonic for the process lifetime —
/// clearing it is an operator action outside this component.
#[derive(Debug)]
pub struct Session {
    history: VecDeque<ContextEntry>,
    muted: bool,
    max_turn_pairs: usize,
}

impl Session {
    fn new(max_turn_pairs: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(max_turn_pairs * 2),
            muted: false,
            max_turn_pairs,
        }
    }

    /// Turn history, oldest first.
    pub fn history(&self) -> Vec<ContextEntry> {
        self.history.iter().cloned().collect()
    }

    /// Append a user/assistant turn pair, then evict oldest pairs until
    /// within the bound. Both turns land atomically — callers never observe
    /// an odd-length history.
    pub fn push_exchange(&mut self, user_text: &str, assistant_text: &str) {
        self.history.push_back(ContextEntry::user(user_text));
        self.history
            .push_back(ContextEntry::assistant(assistant_text));
        while self.history.len() > self.max_turn_pairs * 2 {
            self.history.pop_front();
            self.history.pop_front();
        }
    }

    /// Latch the mute flag. Idempotent.
    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Store of all sessions, keyed by customer id. Sessions are created
/// lazily on first access and live for the process lifetime.
pub struct SessionStore {
    max_turn_pairs: usize,
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    /// Create a store with the given history bound (in turn-pairs).
    pub fn new(max_turn_pairs: usize) -> Self {
        Self {
            max_turn_pairs,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    async fn entry(&self, customer_id: &str) -> Arc<Mutex<Session>> {
        let mut map = self.sessions.lock().await;
        map.entry(customer_id.to_string())
            .or_insert_with(|| {
                debug!("session created for {customer_id}");
                Arc::new(Mutex::new(Session::new(self.max_turn_pairs)))
            })
            .clone()
    }

    /// Acquire the per-customer lock for a whole orchestration run.
    ///
    /// Holding the returned guard serializes runs for this customer while
    /// leaving every other customer's session free.
    pub async fn lock(&self, customer_id: &str) -> OwnedMutexGuard<Session> {
        self.entry(customer_id).await.lock_owned().await
    }

    /// Append a turn pair for a customer.
    pub async fn append_exchange(&self, customer_id: &str, user_text: &str, assistant_text: &str) {
        let session = self.entry(customer_id).await;
        session.lock().await.push_exchange(user_text, assistant_text);
    }

    /// History for a customer, oldest first. Empty for unknown customers.
    pub async fn history(&self, customer_id: &str) -> Vec<ContextEntry> {
        let session = self.entry(customer_id).await;
        let guard = session.lock().await;
        guard.history()
    }

    /// Latch mute for a customer. Idempotent.
    pub async fn mute(&self, customer_id: &str) {
        let session = self.entry(customer_id).await;
        session.lock().await.mute();
    }

    pub async fn is_muted(&self, customer_id: &str) -> bool {
        let session = self.entry(customer_id).await;
        let guard = session.lock().await;
        guard.is_muted()
    }

    /// Number of sessions created so far.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
