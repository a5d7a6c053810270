//! Platform roles.

use crate::error::RoleError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A platform role, as the backend reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Applies for scholarships and writes reviews.
    Student,
    /// Processes applications and moderates reviews.
    Moderator,
    /// Manages scholarships and users.
    Admin,
}

impl Role {
    /// Every role, lowest privilege first.
    pub const ALL: [Self; 3] = [Self::Student, Self::Moderator, Self::Admin];

    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err(RoleError::UnknownRole {
                value: s.to_string(),
            }),
        }
    }
}

/// What is known about the current identity's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleState {
    /// The lookup has not finished.
    Pending,
    /// The backend reported this role.
    Known(Role),
    /// The lookup failed or returned nothing usable.
    Unknown,
}

impl RoleState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns the role, if known.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        match self {
            Self::Known(role) => Some(*role),
            Self::Pending | Self::Unknown => None,
        }
    }
}

impl fmt::Display for RoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Known(role) => write!(f, "{role}"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" Moderator ".parse::<Role>(), Ok(Role::Moderator));
        assert!(matches!(
            "superuser".parse::<Role>(),
            Err(RoleError::UnknownRole { .. })
        ));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Role::Student).expect("serialize");
        assert_eq!(json, "\"student\"");
        let parsed: Role = serde_json::from_str("\"admin\"").expect("deserialize");
        assert_eq!(parsed, Role::Admin);
    }

    #[test]
    fn state_exposes_role() {
        assert_eq!(RoleState::Known(Role::Moderator).role(), Some(Role::Moderator));
        assert_eq!(RoleState::Unknown.role(), None);
        assert!(RoleState::Pending.is_pending());
        assert_eq!(RoleState::Known(Role::Admin).to_string(), "admin");
    }
}
