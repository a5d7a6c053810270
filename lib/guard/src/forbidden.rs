//! The view rendered when a role guard denies access.

use scholarhub_session::{HOME_PATH, Location, Navigator};
use std::fmt;

/// An action offered on the forbidden view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForbiddenAction {
    /// Return to the previous page.
    GoBack,
    /// Go to the home page.
    BackToHome,
}

impl ForbiddenAction {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::GoBack => "Go Back",
            Self::BackToHome => "Back to Home",
        }
    }

    /// Carries out the action.
    pub fn perform(&self, navigator: &dyn Navigator) {
        match self {
            Self::GoBack => navigator.back(),
            Self::BackToHome => navigator.navigate(Location::new(HOME_PATH)),
        }
    }
}

/// Access denied for the current role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForbiddenView {
    status: u16,
    title: &'static str,
    message: &'static str,
}

impl ForbiddenView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: 403,
            title: "Access Forbidden",
            message: "Sorry, you don't have permission to access this page. \
                      Please contact your administrator if you think this is a mistake.",
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.title
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message
    }

    #[must_use]
    pub fn actions(&self) -> [ForbiddenAction; 2] {
        [ForbiddenAction::GoBack, ForbiddenAction::BackToHome]
    }
}

impl Default for ForbiddenView {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ForbiddenView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.title)
    }
}
