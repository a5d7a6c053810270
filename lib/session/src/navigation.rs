//! Navigation targets and the navigator seam.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Landing path for signed-in users and the sign-out destination.
pub const HOME_PATH: &str = "/";

/// Default path of the sign-in page.
pub const SIGN_IN_PATH: &str = "/signIn";

/// A navigation target.
///
/// `return_to` carries the path a guard redirected away from, so the
/// sign-in flow can send the user back once authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    path: String,
    return_to: Option<String>,
}

impl Location {
    /// Creates a plain location.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_to: None,
        }
    }

    /// Creates a location that remembers where the user was headed.
    #[must_use]
    pub fn with_return_to(path: impl Into<String>, return_to: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_to: Some(return_to.into()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.return_to {
            Some(from) => write!(f, "{} (from {from})", self.path),
            None => write!(f, "{}", self.path),
        }
    }
}

/// Moves the client between pages.
pub trait Navigator: Send + Sync {
    /// Pushes a new location.
    fn navigate(&self, location: Location);

    /// Returns to the previous location, if there is one.
    fn back(&self);
}

/// A navigator that keeps an in-memory history stack.
#[derive(Debug)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<Location>>,
}

impl HistoryNavigator {
    /// Creates a history positioned at `start`.
    #[must_use]
    pub fn new(start: &str) -> Self {
        Self {
            entries: Mutex::new(vec![Location::new(start)]),
        }
    }

    /// Returns the current location.
    #[must_use]
    pub fn current(&self) -> Location {
        self.entries()
            .last()
            .cloned()
            .unwrap_or_else(|| Location::new(HOME_PATH))
    }

    /// Returns every location in the stack, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Location> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Location>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new(HOME_PATH)
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, location: Location) {
        debug!(%location, "navigate");
        self.lock().push(location);
    }

    fn back(&self) {
        let mut entries = self.lock();
        if entries.len() > 1 {
            entries.pop();
        }
    }
}
