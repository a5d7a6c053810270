//! In-process identity provider.
//!
//! Behaves like the hosted provider for the cases the client cares about
//! (validation failures, throttling, federated sign-in outcomes) without a
//! network. Used for local development and throughout the test suites.

use crate::error::AuthError;
use crate::identity::{Identity, Uid};
use crate::provider::IdentityProvider;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;
use ulid::Ulid;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Failed password attempts before an email is throttled.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

struct Account {
    /// `None` for accounts created through federated sign-in.
    password: Option<String>,
    identity: Identity,
}

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    failed_attempts: HashMap<String, u32>,
    federated: Option<Identity>,
    popup_blocked: bool,
    offline: bool,
    reset_requests: Vec<String>,
}

/// Identity provider holding accounts in memory.
pub struct MemoryIdentityProvider {
    state: Mutex<MemoryState>,
    current: watch::Sender<Option<Identity>>,
}

impl MemoryIdentityProvider {
    /// Creates a provider with no accounts and nobody signed in.
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            state: Mutex::new(MemoryState::default()),
            current,
        }
    }

    /// Adds an email/password account.
    #[must_use]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.state();
            state.accounts.insert(
                email.to_lowercase(),
                Account {
                    password: Some(password.to_string()),
                    identity: new_identity(email),
                },
            );
        }
        self
    }

    /// Sets the account the federated popup returns; `None` means the user
    /// closes the popup.
    pub fn set_federated_account(&self, identity: Option<Identity>) {
        self.state().federated = identity;
    }

    /// Makes the federated popup fail to open.
    pub fn set_popup_blocked(&self, blocked: bool) {
        self.state().popup_blocked = blocked;
    }

    /// Simulates losing the connection to the provider.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Returns the emails password resets were sent to, oldest first.
    #[must_use]
    pub fn reset_requests(&self) -> Vec<String> {
        self.state().reset_requests.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, identity: Option<Identity>) {
        debug!(
            uid = identity.as_ref().map(|i| i.uid().as_str()),
            "memory provider identity changed"
        );
        self.current.send_replace(identity);
    }
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn new_identity(email: &str) -> Identity {
    let now = Utc::now();
    Identity::new(Uid::new(Ulid::new().to_string()), Some(email.to_string()))
        .with_timestamps(Some(now), Some(now))
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn touch_sign_in(identity: &Identity) -> Identity {
    identity
        .clone()
        .with_timestamps(identity.created_at(), Some(Utc::now()))
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    fn observe(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    fn current(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = {
            let mut state = self.state();
            if state.offline {
                return Err(AuthError::NetworkUnreachable);
            }
            if !looks_like_email(email) {
                return Err(AuthError::MalformedInput);
            }
            if password.len() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword);
            }
            let key = email.to_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(AuthError::AlreadyExists);
            }
            let identity = new_identity(email);
            state.accounts.insert(
                key,
                Account {
                    password: Some(password.to_string()),
                    identity: identity.clone(),
                },
            );
            identity
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let identity = {
            let mut guard = self.state();
            let state = &mut *guard;
            if state.offline {
                return Err(AuthError::NetworkUnreachable);
            }
            if !looks_like_email(email) {
                return Err(AuthError::MalformedInput);
            }
            let key = email.to_lowercase();
            if state.failed_attempts.get(&key).copied().unwrap_or(0) >= MAX_FAILED_ATTEMPTS {
                return Err(AuthError::RateLimited);
            }
            let Some(account) = state.accounts.get_mut(&key) else {
                return Err(AuthError::NotFound);
            };
            if account.password.as_deref() != Some(password) {
                *state.failed_attempts.entry(key).or_insert(0) += 1;
                return Err(AuthError::BadCredential);
            }
            account.identity = touch_sign_in(&account.identity);
            let identity = account.identity.clone();
            state.failed_attempts.remove(&key);
            identity
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in_with_popup(&self) -> Result<Identity, AuthError> {
        let identity = {
            let mut state = self.state();
            if state.offline {
                return Err(AuthError::NetworkUnreachable);
            }
            if state.popup_blocked {
                return Err(AuthError::PopupBlocked);
            }
            let Some(federated) = state.federated.clone() else {
                return Err(AuthError::PopupDismissed);
            };
            let key = federated
                .email()
                .map_or_else(|| federated.uid().to_string(), str::to_lowercase);
            let account = state.accounts.entry(key).or_insert_with(|| Account {
                password: None,
                identity: federated,
            });
            account.identity = touch_sign_in(&account.identity);
            account.identity.clone()
        };
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let current = self.current().ok_or(AuthError::NoCurrentIdentity)?;
        let updated = {
            let mut state = self.state();
            if state.offline {
                return Err(AuthError::NetworkUnreachable);
            }
            let updated = current.clone().with_profile(
                display_name
                    .map(str::to_string)
                    .or_else(|| current.display_name().map(str::to_string)),
                photo_url
                    .map(str::to_string)
                    .or_else(|| current.photo_url().map(str::to_string)),
            );
            if let Some(account) = state
                .accounts
                .values_mut()
                .find(|a| a.identity.uid() == current.uid())
            {
                account.identity = updated.clone();
            }
            updated
        };
        self.publish(Some(updated.clone()));
        Ok(updated)
    }

    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let mut state = self.state();
        if state.offline {
            return Err(AuthError::NetworkUnreachable);
        }
        if !looks_like_email(email) {
            return Err(AuthError::MalformedInput);
        }
        if !state.accounts.contains_key(&email.to_lowercase()) {
            return Err(AuthError::NotFound);
        }
        state.reset_requests.push(email.to_string());
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryIdentityProvider {
        MemoryIdentityProvider::new().with_account("ada@example.com", "correct-horse")
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada.example.com"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("ada @example.com"));
    }

    #[tokio::test]
    async fn sign_in_publishes_identity() {
        let provider = provider();
        let mut observer = provider.observe();
        assert!(observer.borrow_and_update().is_none());

        let identity = provider
            .sign_in_with_password("ada@example.com", "correct-horse")
            .await
            .expect("sign in");

        assert!(observer.has_changed().expect("sender alive"));
        assert_eq!(observer.borrow().as_ref(), Some(&identity));
        assert_eq!(provider.current(), Some(identity));
    }

    #[tokio::test]
    async fn sign_in_failures() {
        let provider = provider();
        assert_eq!(
            provider.sign_in_with_password("bob@example.com", "whatever").await,
            Err(AuthError::NotFound)
        );
        assert_eq!(
            provider.sign_in_with_password("ada@example.com", "wrong").await,
            Err(AuthError::BadCredential)
        );
        assert_eq!(
            provider.sign_in_with_password("not-an-email", "x").await,
            Err(AuthError::MalformedInput)
        );
        assert!(provider.current().is_none());
    }

    #[tokio::test]
    async fn repeated_failures_are_throttled() {
        let provider = provider();
        for _ in 0..MAX_FAILED_ATTEMPTS {
            let _ = provider.sign_in_with_password("ada@example.com", "wrong").await;
        }
        assert_eq!(
            provider
                .sign_in_with_password("ada@example.com", "correct-horse")
                .await,
            Err(AuthError::RateLimited)
        );
    }

    #[tokio::test]
    async fn create_account_validation() {
        let provider = provider();
        assert_eq!(
            provider.create_account("ada@example.com", "long-enough").await,
            Err(AuthError::AlreadyExists)
        );
        assert_eq!(
            provider.create_account("bob@example.com", "123").await,
            Err(AuthError::WeakPassword)
        );
        let bob = provider
            .create_account("bob@example.com", "long-enough")
            .await
            .expect("create");
        assert_eq!(bob.email(), Some("bob@example.com"));
        assert_eq!(provider.current(), Some(bob));
    }

    #[tokio::test]
    async fn popup_outcomes() {
        let provider = provider();
        assert_eq!(
            provider.sign_in_with_popup().await,
            Err(AuthError::PopupDismissed)
        );

        provider.set_popup_blocked(true);
        assert_eq!(provider.sign_in_with_popup().await, Err(AuthError::PopupBlocked));
        provider.set_popup_blocked(false);

        let grace = Identity::new(Uid::from("google-grace"), Some("grace@example.com".into()));
        provider.set_federated_account(Some(grace.clone()));
        let signed_in = provider.sign_in_with_popup().await.expect("popup");
        assert_eq!(signed_in.uid(), grace.uid());

        // Second popup sign-in reuses the stored account.
        let again = provider.sign_in_with_popup().await.expect("popup");
        assert_eq!(again.uid(), grace.uid());
    }

    #[tokio::test]
    async fn update_profile_requires_identity() {
        let provider = provider();
        assert_eq!(
            provider.update_profile(Some("Ada"), None).await,
            Err(AuthError::NoCurrentIdentity)
        );

        provider
            .sign_in_with_password("ada@example.com", "correct-horse")
            .await
            .expect("sign in");
        let updated = provider
            .update_profile(Some("Ada"), Some("https://img.example.com/a.png"))
            .await
            .expect("update");
        assert_eq!(updated.display_name(), Some("Ada"));

        let renamed = provider
            .update_profile(Some("Countess"), None)
            .await
            .expect("update");
        assert_eq!(renamed.display_name(), Some("Countess"));
        assert_eq!(renamed.photo_url(), Some("https://img.example.com/a.png"));
    }

    #[tokio::test]
    async fn password_reset_records_request() {
        let provider = provider();
        provider
            .send_password_reset("ada@example.com")
            .await
            .expect("reset");
        assert_eq!(
            provider.send_password_reset("bob@example.com").await,
            Err(AuthError::NotFound)
        );
        assert_eq!(provider.reset_requests(), vec!["ada@example.com".to_string()]);
    }

    #[tokio::test]
    async fn offline_provider_is_unreachable() {
        let provider = provider();
        provider.set_offline(true);
        assert_eq!(
            provider
                .sign_in_with_password("ada@example.com", "correct-horse")
                .await,
            Err(AuthError::NetworkUnreachable)
        );
        assert_eq!(
            provider.send_password_reset("ada@example.com").await,
            Err(AuthError::NetworkUnreachable)
        );
    }
}
