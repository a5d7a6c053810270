//! Route guards and chain evaluation.
//!
//! A guard never decides while the session is loading, and a role guard
//! never decides while the role lookup is pending. Anything other than a
//! known, matching role denies.

use crate::forbidden::ForbiddenView;
use crate::role::{Role, RoleState};
use scholarhub_session::{Location, SessionSnapshot};
use std::fmt;

/// A single access requirement on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Requires a signed-in identity; otherwise redirects to sign-in.
    Authenticated,
    /// Requires exactly this role; otherwise renders the forbidden view.
    Role(Role),
}

/// What a guard decides for a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Show a progress indicator; no decision yet.
    Waiting,
    /// Navigate away, remembering the requested path.
    Redirect(Location),
    /// Render the access-denied view.
    Forbidden(ForbiddenView),
    /// Render the protected content.
    Render,
}

impl GuardOutcome {
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }
}

impl fmt::Display for GuardOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Redirect(location) => write!(f, "redirect to {location}"),
            Self::Forbidden(view) => write!(f, "forbidden ({view})"),
            Self::Render => write!(f, "render"),
        }
    }
}

/// Everything a guard looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInput<'a> {
    pub session: &'a SessionSnapshot,
    pub role: RoleState,
    pub requested_path: &'a str,
    pub sign_in_path: &'a str,
}

impl Guard {
    /// Decides this guard alone.
    #[must_use]
    pub fn check(&self, input: &GuardInput<'_>) -> GuardOutcome {
        if input.session.is_loading() {
            return GuardOutcome::Waiting;
        }

        match self {
            Self::Authenticated => {
                if input.session.is_authenticated() {
                    GuardOutcome::Render
                } else {
                    GuardOutcome::Redirect(Location::with_return_to(
                        input.sign_in_path,
                        input.requested_path,
                    ))
                }
            }
            Self::Role(required) => match input.role {
                RoleState::Pending if input.session.is_authenticated() => GuardOutcome::Waiting,
                RoleState::Known(role) if role == *required && input.session.is_authenticated() => {
                    GuardOutcome::Render
                }
                _ => GuardOutcome::Forbidden(ForbiddenView::new()),
            },
        }
    }

    #[must_use]
    pub fn needs_role(&self) -> bool {
        matches!(self, Self::Role(_))
    }
}

/// Evaluates a guard chain outermost first; the first non-`Render` outcome
/// wins.
#[must_use]
pub fn evaluate(chain: &[Guard], input: &GuardInput<'_>) -> GuardOutcome {
    for guard in chain {
        let outcome = guard.check(input);
        if !outcome.is_render() {
            return outcome;
        }
    }
    GuardOutcome::Render
}
