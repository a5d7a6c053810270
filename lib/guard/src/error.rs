//! Role lookup error types.

use std::fmt;

/// Errors from resolving an identity's role.
///
/// None of these reach a guard: every failure resolves to an unknown role,
/// which guards treat as denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    /// The role name is not one the platform defines.
    UnknownRole {
        /// The rejected name.
        value: String,
    },
    /// The identity has no email, so its role cannot be looked up.
    MissingEmail {
        /// The identity's uid.
        uid: String,
    },
    /// The backend returned no role for the identity.
    NoRole {
        /// The identity's email.
        email: String,
    },
    /// The role request failed.
    FetchFailed {
        /// The identity's email.
        email: String,
        /// Error details.
        details: String,
    },
}

impl fmt::Display for RoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRole { value } => write!(f, "unknown role '{value}'"),
            Self::MissingEmail { uid } => {
                write!(f, "identity '{uid}' has no email to look up a role for")
            }
            Self::NoRole { email } => write!(f, "no role assigned to '{email}'"),
            Self::FetchFailed { email, details } => {
                write!(f, "failed to fetch role for '{email}': {details}")
            }
        }
    }
}

impl std::error::Error for RoleError {}
