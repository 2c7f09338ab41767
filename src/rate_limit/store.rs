//! Attempt counter storage.
//!
//! Stores only persist counters; the windowing rules live in [`next_state`] so
//! every backend applies the same transitions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

use super::config::LimitConfig;
use super::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttemptState {
    pub attempts: u32,
    pub attempted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AttemptState {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Keyed attempt counters with atomic increment.
pub trait AttemptCounter: Send + Sync {
    /// Current state for `key`, `None` when absent or expired at `now`.
    fn fetch(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<AttemptState>, Error>> + Send;

    /// Count one attempt in a single atomic step and return the new state.
    ///
    /// A state already at `max_attempts` inside its window is returned
    /// unchanged.
    fn increment(
        &self,
        key: &str,
        limit: &LimitConfig,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<AttemptState, Error>> + Send;

    /// Overwrite the state for `key`.
    fn put(
        &self,
        key: &str,
        state: AttemptState,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

/// State after one counted attempt.
#[must_use]
pub fn next_state(
    current: Option<AttemptState>,
    limit: &LimitConfig,
    now: DateTime<Utc>,
) -> AttemptState {
    match current {
        Some(state) if !state.is_expired(now) && state.attempts >= limit.max_attempts => state,
        Some(state) if !state.is_expired(now) => {
            let attempts = state.attempts.saturating_add(1);
            AttemptState {
                attempts,
                attempted_at: now,
                expires_at: now + limit.window_for(attempts),
            }
        }
        _ => AttemptState {
            attempts: 1,
            attempted_at: now,
            expires_at: now + limit.window_for(1),
        },
    }
}

/// In-process store. Clones share the same counters.
///
/// Expired entries are dropped on every increment, so the map only holds keys
/// with a live window.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    states: Arc<Mutex<HashMap<String, AttemptState>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttemptCounter for MemoryStore {
    async fn fetch(&self, key: &str, now: DateTime<Utc>) -> Result<Option<AttemptState>, Error> {
        let states = self.states.lock().await;
        Ok(states
            .get(key)
            .copied()
            .filter(|state| !state.is_expired(now)))
    }

    #[instrument(level = "debug", skip(self, limit))]
    async fn increment(
        &self,
        key: &str,
        limit: &LimitConfig,
        now: DateTime<Utc>,
    ) -> Result<AttemptState, Error> {
        let mut states = self.states.lock().await;
        states.retain(|_, state| !state.is_expired(now));
        let state = next_state(states.get(key).copied(), limit, now);
        states.insert(key.to_string(), state);
        Ok(state)
    }

    async fn put(&self, key: &str, state: AttemptState) -> Result<(), Error> {
        self.states.lock().await.insert(key.to_string(), state);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.states.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    const KEY: &str = "rate_limit:1:idv_doc_auth";

    #[test]
    fn next_state_restarts_expired_windows() {
        let limit = LimitConfig::new(3, 10);
        let now = Utc::now();
        let expired = AttemptState {
            attempts: 3,
            attempted_at: now - Duration::minutes(20),
            expires_at: now - Duration::minutes(10),
        };
        let state = next_state(Some(expired), &limit, now);
        assert_eq!(state.attempts, 1);
        assert_eq!(state.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn next_state_leaves_limited_state_untouched() {
        let limit = LimitConfig::new(1, 10);
        let now = Utc::now();
        let limited = next_state(None, &limit, now);
        let later = now + Duration::minutes(5);
        assert_eq!(next_state(Some(limited), &limit, later), limited);
    }

    #[tokio::test]
    async fn memory_store_counts_and_expires() {
        let store = MemoryStore::new();
        let limit = LimitConfig::new(5, 10);
        let now = Utc::now();

        assert_eq!(store.fetch(KEY, now).await.unwrap(), None);

        store.increment(KEY, &limit, now).await.unwrap();
        let state = store.increment(KEY, &limit, now).await.unwrap();
        assert_eq!(state.attempts, 2);
        assert_eq!(store.fetch(KEY, now).await.unwrap(), Some(state));

        let after_window = now + Duration::minutes(10);
        assert_eq!(store.fetch(KEY, after_window).await.unwrap(), None);

        store.delete(KEY).await.unwrap();
        assert_eq!(store.fetch(KEY, now).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_store_drops_expired_entries_on_increment() {
        let store = MemoryStore::new();
        let limit = LimitConfig::new(5, 10);
        let now = Utc::now();

        store.increment(KEY, &limit, now).await.unwrap();
        store
            .increment("rate_limit:2:idv_doc_auth", &limit, now)
            .await
            .unwrap();
        assert_eq!(store.states.lock().await.len(), 2);

        let after_window = now + Duration::minutes(10);
        let state = store
            .increment("rate_limit:3:idv_doc_auth", &limit, after_window)
            .await
            .unwrap();
        assert_eq!(state.attempts, 1);

        let states = store.states.lock().await;
        assert_eq!(states.len(), 1);
        assert!(states.contains_key("rate_limit:3:idv_doc_auth"));
    }

    #[tokio::test]
    async fn memory_store_clones_share_counters() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let limit = LimitConfig::new(5, 10);
        let now = Utc::now();

        store.increment(KEY, &limit, now).await.unwrap();
        assert_eq!(clone.fetch(KEY, now).await.unwrap().unwrap().attempts, 1);
    }
}
