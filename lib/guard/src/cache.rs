//! Per-identity role cache with single-flight lookups.

use crate::role::RoleState;
use scholarhub_session::Uid;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::debug;

/// Cache key: the query name plus the identity it is for.
type RoleKey = (&'static str, Uid);

const ROLE_QUERY: &str = "role";

struct Entry {
    /// Session epoch the entry was fetched under.
    epoch: u64,
    cell: Arc<OnceCell<RoleState>>,
}

/// Caches the role of the current identity.
///
/// Concurrent lookups for the same identity share one fetch. Looking up a
/// different identity, or the same identity under a new session epoch,
/// drops what was cached before.
#[derive(Default)]
pub struct RoleCache {
    entries: Mutex<HashMap<RoleKey, Entry>>,
}

impl RoleCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached state without fetching.
    #[must_use]
    pub fn peek(&self, uid: &Uid, epoch: u64) -> RoleState {
        self.lock()
            .get(&key(uid))
            .filter(|entry| entry.epoch == epoch)
            .and_then(|entry| entry.cell.get().copied())
            .unwrap_or(RoleState::Pending)
    }

    /// Returns the cached state, running `fetch` if nothing is cached yet.
    pub async fn get_or_fetch<F, Fut>(&self, uid: &Uid, epoch: u64, fetch: F) -> RoleState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RoleState>,
    {
        let cell = {
            let mut entries = self.lock();
            let before = entries.len();
            entries.retain(|(_, cached), entry| cached == uid && entry.epoch == epoch);
            if entries.len() != before {
                debug!(%uid, epoch, "evicted roles cached for another session");
            }
            entries
                .entry(key(uid))
                .or_insert_with(|| Entry {
                    epoch,
                    cell: Arc::new(OnceCell::new()),
                })
                .cell
                .clone()
        };
        *cell.get_or_init(fetch).await
    }

    /// Drops every cached role.
    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RoleKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn key(uid: &Uid) -> RoleKey {
    (ROLE_QUERY, uid.clone())
}
