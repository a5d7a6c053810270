//! Handle identifiers for scoped client resources.
//!
//! Registrations that must be released later (an observer subscription, a
//! response interceptor) are tagged with a ULID so that a stale release
//! can be told apart from the current registration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the prefix used for display formatting.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let ulid_str = s
                    .strip_prefix(concat!($prefix, "_"))
                    .unwrap_or(s);

                Ulid::from_str(ulid_str)
                    .map(Self)
                    .map_err(|e| ParseIdError {
                        id_type: stringify!($name),
                        reason: e.to_string(),
                    })
            }
        }
    };
}

define_id!(
    /// Identifies one registration of an unauthorized-response handler.
    InterceptorId,
    "icpt"
);

define_id!(
    /// Identifies one identity-observer subscription.
    ObserverId,
    "obs"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interceptor_id_display_format() {
        let id = InterceptorId::new();
        assert!(id.to_string().starts_with("icpt_"));
    }

    #[test]
    fn parse_with_and_without_prefix() {
        let id = ObserverId::new();
        let parsed: ObserverId = id.to_string().parse().expect("should parse");
        assert_eq!(id, parsed);

        let raw: ObserverId = id.as_ulid().to_string().parse().expect("should parse");
        assert_eq!(id, raw);
    }

    #[test]
    fn parse_invalid_ulid() {
        let err = "obs_nope".parse::<ObserverId>().unwrap_err();
        assert_eq!(err.id_type, "ObserverId");
    }

    #[test]
    fn fresh_ids_differ() {
        assert_ne!(InterceptorId::new(), InterceptorId::new());
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = InterceptorId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }
}
