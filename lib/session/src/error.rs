//! Error types for the session crate.
//!
//! - `AuthError`: identity-provider failures, shown to the user by the form
//!   that triggered them
//! - `SessionSyncError`: server session cookie synchronization failures,
//!   logged and never fatal to the calling flow

use std::fmt;

/// Errors from identity-provider operations.
///
/// Provider-specific error codes are mapped into this closed set by
/// [`AuthError::from_provider_code`] at the provider boundary; nothing else
/// inspects provider strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No account exists for the given email.
    NotFound,
    /// The password (or other credential) was rejected.
    BadCredential,
    /// An account already exists for the given email.
    AlreadyExists,
    /// The provider rejected the password as too weak.
    WeakPassword,
    /// Too many attempts; the provider is throttling requests.
    RateLimited,
    /// The user closed the federated sign-in popup.
    PopupDismissed,
    /// The federated sign-in popup could not be opened.
    PopupBlocked,
    /// The provider could not be reached.
    NetworkUnreachable,
    /// The request was malformed (e.g. an invalid email address).
    MalformedInput,
    /// The operation requires a signed-in identity and there is none.
    NoCurrentIdentity,
    /// The provider accepted the operation but the observer never confirmed it.
    SettleTimeout,
    /// A provider code with no mapping.
    Unrecognized {
        /// The raw provider code.
        code: String,
    },
}

impl AuthError {
    /// Maps an Identity Toolkit error code to an `AuthError`.
    ///
    /// Codes may carry a trailing explanation (`"WEAK_PASSWORD : Password
    /// should be at least 6 characters"`); only the leading token is used.
    #[must_use]
    pub fn from_provider_code(raw: &str) -> Self {
        let code = raw.split(':').next().unwrap_or(raw).trim();
        match code {
            "EMAIL_NOT_FOUND" | "USER_NOT_FOUND" => Self::NotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
                Self::BadCredential
            }
            "EMAIL_EXISTS" => Self::AlreadyExists,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::RateLimited,
            "INVALID_EMAIL" | "MISSING_EMAIL" | "MISSING_PASSWORD" => Self::MalformedInput,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_TOKEN_EXPIRED" => {
                Self::NoCurrentIdentity
            }
            _ => Self::Unrecognized {
                code: code.to_string(),
            },
        }
    }

    /// Returns the message shown to the user next to the form that failed.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::NotFound => "No account found with this email address.",
            Self::BadCredential => "Incorrect email or password.",
            Self::AlreadyExists => "An account with this email already exists.",
            Self::WeakPassword => "Password should be at least 6 characters.",
            Self::RateLimited => "Too many requests. Please try again later.",
            Self::PopupDismissed => "Sign-in was cancelled.",
            Self::PopupBlocked => "The sign-in window could not be opened.",
            Self::NetworkUnreachable => "Network error. Please check your connection.",
            Self::MalformedInput => "Invalid email address format.",
            Self::NoCurrentIdentity => "Please sign in again.",
            Self::SettleTimeout | Self::Unrecognized { .. } => {
                "Something went wrong. Please try again."
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "account not found"),
            Self::BadCredential => write!(f, "credential rejected"),
            Self::AlreadyExists => write!(f, "account already exists"),
            Self::WeakPassword => write!(f, "password too weak"),
            Self::RateLimited => write!(f, "too many attempts"),
            Self::PopupDismissed => write!(f, "federated sign-in popup closed"),
            Self::PopupBlocked => write!(f, "federated sign-in popup blocked"),
            Self::NetworkUnreachable => write!(f, "identity provider unreachable"),
            Self::MalformedInput => write!(f, "malformed input"),
            Self::NoCurrentIdentity => write!(f, "no signed-in identity"),
            Self::SettleTimeout => write!(f, "session state was not confirmed in time"),
            Self::Unrecognized { code } => write!(f, "identity provider error: {code}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from keeping the server session cookie in step with the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSyncError {
    /// The issue-session request failed.
    IssueFailed {
        /// The email the session was requested for.
        email: String,
        /// Error details.
        details: String,
    },
    /// The clear-session request failed.
    ClearFailed {
        /// Error details.
        details: String,
    },
    /// The identity has no email to issue a session for.
    MissingEmail {
        /// The identity's uid.
        uid: String,
    },
}

impl fmt::Display for SessionSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IssueFailed { email, details } => {
                write!(f, "failed to issue session for {email}: {details}")
            }
            Self::ClearFailed { details } => {
                write!(f, "failed to clear session: {details}")
            }
            Self::MissingEmail { uid } => {
                write!(f, "identity {uid} has no email to issue a session for")
            }
        }
    }
}

impl std::error::Error for SessionSyncError {}
