//! The session store: single source of truth for who is signed in.
//!
//! Identity transitions only ever come from the provider's observer. The
//! store's operations ask the provider for a change, then wait until the
//! observer has delivered it and the token bridge has synced the server
//! session, so callers never navigate on a state the rest of the client
//! has not seen yet.

use crate::bridge::TokenBridge;
use crate::error::AuthError;
use crate::identity::{Identity, Uid};
use crate::provider::IdentityProvider;
use crate::session::{SessionPhase, SessionSnapshot};
use scholarhub_core::ObserverId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// The provider-observer task, aborted when dropped.
struct ObserverSubscription {
    id: ObserverId,
    task: JoinHandle<()>,
}

impl Drop for ObserverSubscription {
    fn drop(&mut self) {
        self.task.abort();
        debug!(observer = %self.id, "identity observer detached");
    }
}

/// Records the phase an operation interrupted so it can be put back.
#[derive(Debug, Clone, Copy)]
struct LoadingTicket {
    previous: SessionPhase,
    epoch: u64,
}

struct StoreInner {
    provider: Arc<dyn IdentityProvider>,
    bridge: TokenBridge,
    state: watch::Sender<SessionSnapshot>,
    epoch: AtomicU64,
    /// Set by `sign_out` once it has cleared the server session, so the
    /// observer's matching anonymous transition does not clear it again.
    cleared_by_sign_out: AtomicBool,
    settle_timeout: Duration,
    observer: Mutex<Option<ObserverSubscription>>,
}

/// Shared handle to the client's session state.
///
/// Clones refer to the same store. The observer subscription lives as long
/// as the store (or until [`detach`](Self::detach)).
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Creates a store in the `Uninitialized` phase.
    #[must_use]
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        bridge: TokenBridge,
        settle_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::uninitialized());
        Self {
            inner: Arc::new(StoreInner {
                provider,
                bridge,
                state,
                epoch: AtomicU64::new(0),
                cleared_by_sign_out: AtomicBool::new(false),
                settle_timeout,
                observer: Mutex::new(None),
            }),
        }
    }

    /// Subscribes to the provider's identity observer.
    ///
    /// Must be called from within a Tokio runtime. Calling it again while
    /// attached does nothing.
    pub fn attach(&self) {
        let mut observer = self.inner.observer();
        if observer.is_some() {
            return;
        }

        let receiver = self.inner.provider.observe();
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.phase() == SessionPhase::Uninitialized {
                *snapshot = snapshot.with_phase(SessionPhase::Loading);
                true
            } else {
                false
            }
        });

        let id = ObserverId::new();
        let task = tokio::spawn(observe_identity(Arc::downgrade(&self.inner), receiver));
        debug!(observer = %id, "identity observer attached");
        *observer = Some(ObserverSubscription { id, task });
    }

    /// Releases the observer subscription; later provider changes are ignored.
    pub fn detach(&self) {
        let subscription = self.inner.observer().take();
        drop(subscription);
    }

    /// Returns true while the observer subscription is held.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.observer().is_some()
    }

    /// Returns the current session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.borrow().clone()
    }

    /// Returns a receiver that is notified on every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state.subscribe()
    }

    /// Waits until the session is authenticated or anonymous.
    pub async fn wait_settled(&self) -> SessionSnapshot {
        let mut receiver = self.subscribe();
        match receiver.wait_for(|snapshot| !snapshot.is_loading()).await {
            Ok(snapshot) => snapshot.clone(),
            // The sender lives in `inner`, which `self` keeps alive.
            Err(_) => self.snapshot(),
        }
    }

    /// Creates an email/password account and signs it in.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let ticket = self.begin_loading();
        let result = self.inner.provider.create_account(email, password).await;
        self.settle_sign_in(result, ticket).await
    }

    /// Signs in with an email/password credential.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let ticket = self.begin_loading();
        let result = self
            .inner
            .provider
            .sign_in_with_password(email, password)
            .await;
        self.settle_sign_in(result, ticket).await
    }

    /// Signs in through the federated provider's popup.
    #[instrument(skip(self))]
    pub async fn sign_in_with_federated_provider(&self) -> Result<Identity, AuthError> {
        let ticket = self.begin_loading();
        let result = self.inner.provider.sign_in_with_popup().await;
        self.settle_sign_in(result, ticket).await
    }

    /// Updates the current identity's display name and photo URL.
    ///
    /// `None` leaves a field unchanged.
    #[instrument(skip(self))]
    pub async fn update_identity(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError> {
        if self.snapshot().identity().is_none() {
            return Err(AuthError::NoCurrentIdentity);
        }

        let updated = self
            .inner
            .provider
            .update_profile(display_name, photo_url)
            .await?;

        let mut receiver = self.subscribe();
        let confirmed = receiver.wait_for(|snapshot| snapshot.identity() == Some(&updated));
        let outcome = match tokio::time::timeout(self.inner.settle_timeout, confirmed).await {
            Ok(Ok(_)) => Ok(updated),
            Ok(Err(_)) | Err(_) => Err(AuthError::SettleTimeout),
        };
        outcome
    }

    /// Sends a password-reset email.
    #[instrument(skip(self))]
    pub async fn reset_password_email(&self, email: &str) -> Result<(), AuthError> {
        let ticket = self.begin_loading();
        let result = self.inner.provider.send_password_reset(email).await;
        self.restore(ticket);
        if let Err(e) = &result {
            debug!(error = %e, "password reset rejected");
        }
        result
    }

    /// Signs out: clears the server session, then the local identity.
    ///
    /// Always completes locally; sync and provider failures are logged.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.send_modify(|snapshot| {
            *snapshot = SessionSnapshot::new(
                SessionPhase::Loading,
                snapshot.identity().cloned(),
                epoch,
            );
        });

        if let Err(report) = self.inner.bridge.clear().await {
            warn!(error = %report, "failed to clear server session during sign-out");
        }
        self.inner.cleared_by_sign_out.store(true, Ordering::SeqCst);

        if let Err(e) = self.inner.provider.sign_out().await {
            warn!(error = %e, "identity provider sign-out failed; clearing local session");
            self.inner.cleared_by_sign_out.store(false, Ordering::SeqCst);
        }

        self.inner
            .publish(SessionSnapshot::new(SessionPhase::Anonymous, None, epoch));
        info!("signed out");
    }

    fn begin_loading(&self) -> LoadingTicket {
        let mut ticket = LoadingTicket {
            previous: SessionPhase::Loading,
            epoch: 0,
        };
        self.inner.state.send_modify(|snapshot| {
            ticket = LoadingTicket {
                previous: snapshot.phase(),
                epoch: snapshot.epoch(),
            };
            *snapshot = snapshot.with_phase(SessionPhase::Loading);
        });
        ticket
    }

    /// Puts back the phase an operation interrupted, unless the session
    /// has moved on since.
    fn restore(&self, ticket: LoadingTicket) {
        if ticket.previous == SessionPhase::Loading {
            return;
        }
        self.inner.state.send_if_modified(|snapshot| {
            if snapshot.phase() == SessionPhase::Loading && snapshot.epoch() == ticket.epoch {
                *snapshot = snapshot.with_phase(ticket.previous);
                true
            } else {
                false
            }
        });
    }

    async fn settle_sign_in(
        &self,
        result: Result<Identity, AuthError>,
        ticket: LoadingTicket,
    ) -> Result<Identity, AuthError> {
        match result {
            Ok(identity) => self.confirm_authenticated(identity.uid(), ticket).await,
            Err(e) => {
                debug!(error = %e, "identity provider rejected sign-in");
                self.restore(ticket);
                Err(e)
            }
        }
    }

    /// Waits for the observer to report `uid` as authenticated.
    async fn confirm_authenticated(
        &self,
        uid: &Uid,
        ticket: LoadingTicket,
    ) -> Result<Identity, AuthError> {
        let mut receiver = self.subscribe();
        let confirmed = receiver.wait_for(|snapshot| {
            snapshot.is_authenticated() && snapshot.identity().map(Identity::uid) == Some(uid)
        });

        let outcome = match tokio::time::timeout(self.inner.settle_timeout, confirmed).await {
            Ok(Ok(snapshot)) => snapshot
                .identity()
                .cloned()
                .ok_or(AuthError::NoCurrentIdentity),
            Ok(Err(_)) | Err(_) => Err(AuthError::SettleTimeout),
        };
        if outcome.is_err() {
            warn!(%uid, "identity observer did not confirm sign-in");
            self.restore(ticket);
        }
        outcome
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &*self.inner.state.borrow())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl StoreInner {
    fn observer(&self) -> MutexGuard<'_, Option<ObserverSubscription>> {
        self.observer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.state.send_replace(snapshot);
    }

    /// Applies one identity value delivered by the provider observer.
    async fn apply(&self, identity: Option<Identity>) {
        let current = self.state.borrow().clone();
        match identity {
            Some(identity) => {
                self.cleared_by_sign_out.store(false, Ordering::SeqCst);

                let same_identity = current.is_authenticated()
                    && current.identity().map(Identity::uid) == Some(identity.uid());
                if same_identity {
                    // Profile refresh: no transition, no server sync.
                    self.publish(SessionSnapshot::new(
                        SessionPhase::Authenticated,
                        Some(identity),
                        current.epoch(),
                    ));
                    return;
                }

                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                self.publish(SessionSnapshot::new(
                    SessionPhase::Loading,
                    Some(identity.clone()),
                    epoch,
                ));

                if let Err(report) = self.bridge.issue(&identity).await {
                    warn!(
                        error = %report,
                        "failed to issue server session; secured requests will be rejected"
                    );
                }

                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!(uid = %identity.uid(), "sign-out overtook session issue");
                    return;
                }
                info!(uid = %identity.uid(), "signed in");
                self.publish(SessionSnapshot::new(
                    SessionPhase::Authenticated,
                    Some(identity),
                    epoch,
                ));
            }
            None => {
                if self.cleared_by_sign_out.swap(false, Ordering::SeqCst) {
                    // `sign_out` publishes the anonymous state itself; a
                    // sign-in may already have started on top of it.
                    debug!("sign-out confirmed by observer");
                    return;
                }
                if current.is_anonymous() {
                    return;
                }

                let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
                if let Err(report) = self.bridge.clear().await {
                    warn!(error = %report, "failed to clear server session");
                }
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("newer transition overtook session clear");
                    return;
                }
                info!("identity provider ended the session");
                self.publish(SessionSnapshot::new(SessionPhase::Anonymous, None, epoch));
            }
        }
    }
}

async fn observe_identity(store: Weak<StoreInner>, mut receiver: watch::Receiver<Option<Identity>>) {
    loop {
        let identity = receiver.borrow_and_update().clone();
        let Some(inner) = store.upgrade() else {
            break;
        };
        inner.apply(identity).await;
        drop(inner);

        if receiver.changed().await.is_err() {
            debug!("identity provider closed its observer");
            break;
        }
    }
}
