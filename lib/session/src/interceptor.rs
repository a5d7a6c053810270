//! Forced sign-out when the server rejects the session.

use crate::navigation::{Location, Navigator};
use crate::store::SessionStore;
use async_trait::async_trait;
use scholarhub_http::{StatusCode, UnauthorizedHandler};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Signs the user out and sends them to the sign-in page on the first
/// 401/403 of an authenticated period.
///
/// Concurrent rejections of the same session collapse into one sign-out
/// and one redirect. A rejection arriving after the session has already
/// left the authenticated phase does nothing, and neither does one for a
/// request sent under an earlier session.
pub struct ForcedSignOut {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
    handled_epoch: Mutex<Option<u64>>,
}

impl ForcedSignOut {
    #[must_use]
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>, sign_in_path: &str) -> Self {
        Self {
            store,
            navigator,
            sign_in_path: sign_in_path.to_string(),
            handled_epoch: Mutex::new(None),
        }
    }

    /// Claims the current authenticated period for a request sent under
    /// `generation`; false if the session is not authenticated, has moved
    /// on since the request was sent, or was already claimed.
    fn claim(&self, generation: u64) -> bool {
        let mut handled = self
            .handled_epoch
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.store.snapshot();
        if !snapshot.is_authenticated()
            || snapshot.epoch() != generation
            || *handled == Some(snapshot.epoch())
        {
            return false;
        }
        *handled = Some(snapshot.epoch());
        true
    }
}

#[async_trait]
impl UnauthorizedHandler for ForcedSignOut {
    fn generation(&self) -> u64 {
        self.store.snapshot().epoch()
    }

    async fn on_unauthorized(&self, status: StatusCode, path: &str, generation: u64) {
        if !self.claim(generation) {
            debug!(%status, path, generation, "stale or already handled session rejection");
            return;
        }

        warn!(%status, path, "server rejected the session; signing out");
        self.store.sign_out().await;
        self.navigator.navigate(Location::new(self.sign_in_path.clone()));
    }
}
