//! API client error types.

use std::fmt;

/// Errors from backend API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The configured base address is not a usable URL.
    InvalidBaseUrl {
        /// The rejected address.
        url: String,
        /// Error details.
        details: String,
    },
    /// The request never produced a response.
    Transport {
        /// The request path.
        path: String,
        /// Error details.
        details: String,
    },
    /// The backend answered with a non-success status.
    Status {
        /// The request path.
        path: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The backend rejected the session cookie (401 or 403).
    ///
    /// The registered unauthorized handler has already run when this is
    /// returned; callers should not surface it to the user.
    SessionInvalid {
        /// The request path.
        path: String,
        /// The HTTP status code.
        status: u16,
    },
    /// The response body did not match the expected shape.
    Decode {
        /// The request path.
        path: String,
        /// Error details.
        details: String,
    },
}

impl ApiError {
    /// Returns true if the backend rejected the session.
    #[must_use]
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBaseUrl { url, details } => {
                write!(f, "invalid API base address '{url}': {details}")
            }
            Self::Transport { path, details } => {
                write!(f, "request to '{path}' failed: {details}")
            }
            Self::Status { path, status } => {
                write!(f, "request to '{path}' returned status {status}")
            }
            Self::SessionInvalid { path, status } => {
                write!(f, "session rejected by '{path}' with status {status}")
            }
            Self::Decode { path, details } => {
                write!(f, "unexpected response from '{path}': {details}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_names_path_and_code() {
        let err = ApiError::Status {
            path: "/users".to_string(),
            status: 500,
        };
        assert!(err.to_string().contains("/users"));
        assert!(err.to_string().contains("500"));
        assert!(!err.is_session_invalid());
    }

    #[test]
    fn session_invalid_is_flagged() {
        let err = ApiError::SessionInvalid {
            path: "/users/a@b.c/role".to_string(),
            status: 401,
        };
        assert!(err.is_session_invalid());
        assert!(err.to_string().contains("session rejected"));
    }
}
