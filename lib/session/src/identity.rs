//! The signed-in principal as reported by the identity provider.
//!
//! The session layer never edits an `Identity` in place; profile changes go
//! through [`IdentityProvider::update_profile`](crate::IdentityProvider::update_profile)
//! and come back through the observer as a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-assigned unique identifier of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Creates a uid from the provider's string.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the uid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    uid: Uid,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    email_verified: bool,
    created_at: Option<DateTime<Utc>>,
    last_sign_in_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Creates an identity with only the uid and email set.
    #[must_use]
    pub fn new(uid: Uid, email: Option<String>) -> Self {
        Self {
            uid,
            email,
            display_name: None,
            photo_url: None,
            email_verified: false,
            created_at: None,
            last_sign_in_at: None,
        }
    }

    /// Sets the display name and photo URL.
    #[must_use]
    pub fn with_profile(mut self, display_name: Option<String>, photo_url: Option<String>) -> Self {
        self.display_name = display_name;
        self.photo_url = photo_url;
        self
    }

    /// Sets the email-verification flag.
    #[must_use]
    pub fn with_email_verified(mut self, verified: bool) -> Self {
        self.email_verified = verified;
        self
    }

    /// Sets the creation and last-sign-in timestamps.
    #[must_use]
    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        last_sign_in_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.last_sign_in_at = last_sign_in_at;
        self
    }

    /// Returns the provider uid.
    #[must_use]
    pub fn uid(&self) -> &Uid {
        &self.uid
    }

    /// Returns the email address, if the provider has one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the display name, if set.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the photo URL, if set.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// Returns true if the provider has verified the email address.
    #[must_use]
    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    /// Returns when the account was created.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Returns when the account last signed in.
    #[must_use]
    pub fn last_sign_in_at(&self) -> Option<DateTime<Utc>> {
        self.last_sign_in_at
    }

    /// Returns the best label for display: name, then email, then uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(self.uid.as_str())
    }
}
