//! The application's route table.

use crate::guard::Guard;
use crate::role::Role;
use std::fmt;

/// A page the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Home,
    AllScholarships,
    WishList,
    SignUp,
    SignIn,
    ForgotPassword,
    ScholarshipDetails,
    ApplyScholarship,
    PaymentSuccess,
    PaymentFail,
    DashboardHome,
    AddScholarship,
    ManageScholarships,
    EditScholarship,
    ManageUsers,
    UserProfile,
    ManageApplications,
    ManageReviews,
    EditApplication,
    MyApplications,
    MyReviews,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A path pattern, its page and the guards wrapping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pattern: String,
    page: Page,
    chain: Vec<Guard>,
}

impl Route {
    #[must_use]
    pub fn new(pattern: &str, page: Page, chain: Vec<Guard>) -> Self {
        Self {
            pattern: pattern.to_string(),
            page,
            chain,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn page(&self) -> Page {
        self.page
    }

    /// Guards outermost first.
    #[must_use]
    pub fn chain(&self) -> &[Guard] {
        &self.chain
    }

    #[must_use]
    pub fn needs_role(&self) -> bool {
        self.chain.iter().any(Guard::needs_role)
    }

    /// Matches a normalized path, capturing `:name` segments.
    fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut params = Vec::new();
        let mut pattern = segments(&self.pattern);
        let mut actual = segments(path);
        loop {
            match (pattern.next(), actual.next()) {
                (None, None) => return Some(params),
                (Some(expected), Some(segment)) => {
                    if let Some(name) = expected.strip_prefix(':') {
                        params.push((name.to_string(), segment.to_string()));
                    } else if expected != segment {
                        return None;
                    }
                }
                _ => return None,
            }
        }
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// A route matched against a concrete path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    /// Returns a captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Ordered list of routes; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The scholarship platform's routes.
    ///
    /// Dashboard children inherit the dashboard's `Authenticated` guard;
    /// admin and moderator pages add a role guard inside it.
    #[must_use]
    pub fn scholarhub() -> Self {
        use Guard::Authenticated;
        use Page::*;

        let admin = || Guard::Role(Role::Admin);
        let moderator = || Guard::Role(Role::Moderator);
        let dashboard = |own: &[Guard]| -> Vec<Guard> {
            let mut chain = vec![Authenticated];
            chain.extend_from_slice(own);
            chain
        };

        Self::new(vec![
            Route::new("/", Home, vec![]),
            Route::new("/scholarships", AllScholarships, vec![]),
            Route::new("/wishlist", WishList, vec![Authenticated]),
            Route::new("/signUp", SignUp, vec![]),
            Route::new("/signIn", SignIn, vec![]),
            Route::new("/forgot-password", ForgotPassword, vec![]),
            Route::new("/scholarship/:id", ScholarshipDetails, vec![Authenticated]),
            Route::new("/scholarship/:id/apply", ApplyScholarship, vec![Authenticated]),
            Route::new("/payment/success", PaymentSuccess, vec![Authenticated]),
            Route::new("/payment/fail", PaymentFail, vec![Authenticated]),
            Route::new("/dashboard", DashboardHome, dashboard(&[])),
            Route::new("/dashboard/add-scholarship", AddScholarship, dashboard(&[admin()])),
            Route::new(
                "/dashboard/manage-scholarships",
                ManageScholarships,
                dashboard(&[admin()]),
            ),
            Route::new(
                "/dashboard/edit-scholarship/:id",
                EditScholarship,
                dashboard(&[admin()]),
            ),
            Route::new("/dashboard/manage-users", ManageUsers, dashboard(&[admin()])),
            Route::new("/dashboard/me", UserProfile, dashboard(&[])),
            Route::new(
                "/dashboard/manage-applications",
                ManageApplications,
                dashboard(&[moderator()]),
            ),
            Route::new(
                "/dashboard/manage-reviews",
                ManageReviews,
                dashboard(&[moderator()]),
            ),
            Route::new(
                "/dashboard/edit-application/:id",
                EditApplication,
                dashboard(&[Authenticated]),
            ),
            Route::new("/dashboard/my-application", MyApplications, dashboard(&[])),
            Route::new("/dashboard/my-reviews", MyReviews, dashboard(&[])),
        ])
    }

    /// Finds the route for a path. Query strings and fragments are ignored.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        self.routes.iter().find_map(|route| {
            route
                .matches(path)
                .map(|params| RouteMatch { route, params })
        })
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::scholarhub()
    }
}
