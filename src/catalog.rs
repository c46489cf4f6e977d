//! Static permission and role catalog.
//!
//! Everything here is immutable data known at process start. Lookups are
//! total over the closed role enum, so `role_definition` only returns
//! `None` if the table below is ever edited out of sync with [`UserRole`].

use serde::Serialize;

use crate::role::{AdminRole, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionCategory {
    Users,
    Settings,
}

impl PermissionCategory {
    pub fn title(self) -> &'static str {
        match self {
            PermissionCategory::Users => "User Management",
            PermissionCategory::Settings => "System Settings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    /// Stable `domain:action` identifier.
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: PermissionCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    pub role: UserRole,
    pub name: &'static str,
    pub description: &'static str,
    /// Intrinsic grants. Only consulted for non-admin roles; admin roles are
    /// governed by the permission matrix.
    pub permissions: &'static [&'static str],
    pub is_admin: bool,
}

const fn perm(
    key: &'static str,
    name: &'static str,
    description: &'static str,
    category: PermissionCategory,
) -> Permission {
    Permission {
        key,
        name,
        description,
        category,
    }
}

pub static PERMISSIONS: &[Permission] = &[
    perm(
        "users:read",
        "View users",
        "View the list of users and their details",
        PermissionCategory::Users,
    ),
    perm(
        "users:create",
        "Create new users",
        "Add new user accounts to the system",
        PermissionCategory::Users,
    ),
    perm(
        "users:update",
        "Edit user details",
        "Modify existing user information and settings",
        PermissionCategory::Users,
    ),
    perm(
        "users:delete",
        "Delete users",
        "Remove user accounts from the system permanently",
        PermissionCategory::Users,
    ),
    perm(
        "users:export",
        "Export user data",
        "Download user information and generate reports",
        PermissionCategory::Users,
    ),
    perm(
        "settings:access",
        "Access settings",
        "View and navigate to system configuration pages",
        PermissionCategory::Settings,
    ),
    perm(
        "permissions:read",
        "View permissions",
        "See the current permission matrix and role configurations",
        PermissionCategory::Settings,
    ),
    perm(
        "permissions:update",
        "Manage permissions",
        "Modify role permissions and access control settings",
        PermissionCategory::Settings,
    ),
    perm(
        "webhooks:read",
        "View webhooks",
        "See webhook configurations and their status",
        PermissionCategory::Settings,
    ),
    perm(
        "webhooks:update",
        "Manage webhooks",
        "Configure webhook endpoints and settings",
        PermissionCategory::Settings,
    ),
];

pub static ROLES: &[RoleDefinition] = &[
    RoleDefinition {
        role: UserRole::Guest,
        name: "Guest",
        description: "Unauthenticated visitor with no access to protected content",
        permissions: &[],
        is_admin: false,
    },
    RoleDefinition {
        role: UserRole::Customer,
        name: "Customer",
        description: "Authenticated user with access to public features only",
        permissions: &[],
        is_admin: false,
    },
    RoleDefinition {
        role: UserRole::Auditor,
        name: "Auditor",
        description: "Read-only admin access with reporting and export capabilities",
        permissions: &["users:read", "users:export"],
        is_admin: true,
    },
    RoleDefinition {
        role: UserRole::Editor,
        name: "Editor",
        description: "User management focused role with create and update capabilities",
        permissions: &["users:read", "users:create", "users:update"],
        is_admin: true,
    },
    RoleDefinition {
        role: UserRole::SuperAdmin,
        name: "Super Admin",
        description: "Complete system control with access to all features and settings",
        permissions: &[
            "users:read",
            "users:create",
            "users:update",
            "users:delete",
            "users:export",
            "settings:access",
            "permissions:read",
            "permissions:update",
            "webhooks:read",
            "webhooks:update",
        ],
        is_admin: true,
    },
];

pub fn role_definition(role: UserRole) -> Option<&'static RoleDefinition> {
    ROLES.iter().find(|def| def.role == role)
}

pub fn permission(key: &str) -> Option<&'static Permission> {
    PERMISSIONS.iter().find(|p| p.key == key)
}

pub fn permissions_by_category(category: PermissionCategory) -> Vec<&'static Permission> {
    PERMISSIONS.iter().filter(|p| p.category == category).collect()
}

/// Admin roles in hierarchy (and column) order.
pub fn admin_roles() -> [AdminRole; 3] {
    AdminRole::HIERARCHY
}

/// Case-insensitive substring search over name, description and key.
/// An empty term matches everything.
pub fn search_permissions(term: &str) -> Vec<&'static Permission> {
    let needle = term.trim().to_lowercase();
    PERMISSIONS
        .iter()
        .filter(|p| {
            needle.is_empty()
                || p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
                || p.key.to_lowercase().contains(&needle)
        })
        .collect()
}
