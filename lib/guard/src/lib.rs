//! Role-gated routing for the scholarhub client.
//!
//! Guards decide whether a page may render for the current session:
//! - [`Guard::Authenticated`] redirects anonymous visitors to sign-in,
//!   remembering where they were headed
//! - [`Guard::Role`] renders the [`ForbiddenView`] unless the identity's
//!   role is known and matches
//!
//! Neither decides while the session or the role lookup is still pending.
//! Roles are fetched through the secured client and cached per identity
//! with single-flight lookups.

mod cache;
mod error;
mod forbidden;
mod gate;
mod guard;
mod menu;
mod resolver;
mod role;
mod routes;

pub use cache::RoleCache;
pub use error::RoleError;
pub use forbidden::{ForbiddenAction, ForbiddenView};
pub use gate::{RouteGate, RouteOutcome};
pub use guard::{Guard, GuardInput, GuardOutcome, evaluate};
pub use menu::{MenuItem, dashboard_menu};
pub use resolver::{RoleResolver, role_path};
pub use role::{Role, RoleState};
pub use routes::{Page, Route, RouteMatch, RouteTable};
