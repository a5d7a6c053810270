//! The identity-provider seam.
//!
//! The session store drives sign-in, sign-up and profile changes through an
//! [`IdentityProvider`] and learns the outcome from the provider's observer
//! channel, never from the operation's return value alone.

use crate::error::AuthError;
use crate::identity::Identity;
use async_trait::async_trait;
use tokio::sync::watch;

/// An external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribes to identity changes.
    ///
    /// The receiver's current value is the identity at subscription time,
    /// and it is updated on every sign-in, sign-out and profile change.
    fn observe(&self) -> watch::Receiver<Option<Identity>>;

    /// Returns the currently signed-in identity.
    fn current(&self) -> Option<Identity>;

    /// Creates an email/password account and signs it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Verifies an email/password credential and signs the account in.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError>;

    /// Runs the federated popup flow, creating the account if needed.
    async fn sign_in_with_popup(&self) -> Result<Identity, AuthError>;

    /// Updates the current identity's display name and photo URL.
    async fn update_profile(
        &self,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Identity, AuthError>;

    /// Sends a password-reset email.
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Signs the current identity out.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// A credential returned by a federated identity provider's popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredential {
    /// The federated provider, e.g. `google.com`.
    pub provider_id: String,
    /// The provider-issued ID token.
    pub id_token: String,
    /// The URI the popup was served from.
    pub request_uri: String,
}

/// Opens the federated sign-in popup and waits for its credential.
#[async_trait]
pub trait FederatedPopup: Send + Sync {
    /// Returns the credential, or `PopupDismissed`/`PopupBlocked`.
    async fn open(&self) -> Result<FederatedCredential, AuthError>;
}
