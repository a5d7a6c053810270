//! Dashboard navigation entries by role.

use crate::role::Role;

/// A dashboard sidebar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub path: &'static str,
    pub roles: &'static [Role],
}

impl MenuItem {
    #[must_use]
    pub fn visible_to(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

const DASHBOARD_MENU: [MenuItem; 9] = [
    MenuItem {
        label: "Analytics",
        path: "/dashboard",
        roles: &[Role::Admin],
    },
    MenuItem {
        label: "Profile",
        path: "/dashboard/me",
        roles: &[Role::Student, Role::Moderator, Role::Admin],
    },
    MenuItem {
        label: "My Application",
        path: "/dashboard/my-application",
        roles: &[Role::Student],
    },
    MenuItem {
        label: "My Reviews",
        path: "/dashboard/my-reviews",
        roles: &[Role::Student],
    },
    MenuItem {
        label: "Manage Applications",
        path: "/dashboard/manage-applications",
        roles: &[Role::Moderator],
    },
    MenuItem {
        label: "Manage Reviews",
        path: "/dashboard/manage-reviews",
        roles: &[Role::Moderator],
    },
    MenuItem {
        label: "Add Scholarships",
        path: "/dashboard/add-scholarship",
        roles: &[Role::Admin],
    },
    MenuItem {
        label: "Manage Scholarships",
        path: "/dashboard/manage-scholarships",
        roles: &[Role::Admin],
    },
    MenuItem {
        label: "Manage Users",
        path: "/dashboard/manage-users",
        roles: &[Role::Admin],
    },
];

/// Returns the entries shown for a role, in sidebar order. An unknown role
/// sees nothing.
#[must_use]
pub fn dashboard_menu(role: Option<Role>) -> Vec<MenuItem> {
    let Some(role) = role else {
        return Vec::new();
    };
    DASHBOARD_MENU
        .iter()
        .filter(|item| item.visible_to(role))
        .copied()
        .collect()
}
