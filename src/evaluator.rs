//! Authorization evaluator.
//!
//! `has_permission_in` and `has_admin_level` are the pure rules. [`Permissions`]
//! is what views consume: the same rules bound to a session snapshot, with
//! every answer forced to `false` until the session is ready.

use crate::catalog::role_definition;
use crate::matrix::{load_matrix, PermissionMatrix};
use crate::role::{AdminRole, UserRole};
use crate::session::SessionSnapshot;
use crate::store::PersistedStore;

/// Decide `role` × `key` against an already-loaded matrix.
pub fn has_permission_in(role: UserRole, key: &str, matrix: &PermissionMatrix) -> bool {
    if role == UserRole::SuperAdmin {
        return true;
    }
    match role.as_admin() {
        None => role_definition(role).is_some_and(|def| def.permissions.iter().any(|p| *p == key)),
        Some(admin) => matrix.granted(key, admin),
    }
}

/// `role` sits at or above `min_level` in the admin hierarchy.
pub fn has_admin_level(role: UserRole, min_level: AdminRole) -> bool {
    role.as_admin()
        .is_some_and(|admin| admin.level() >= min_level.level())
}

/// Evaluator bound to a persisted store; the effective matrix is re-read on
/// every query so a freshly saved override takes effect immediately.
pub struct Authorizer<'s> {
    store: &'s dyn PersistedStore,
}

impl<'s> Authorizer<'s> {
    pub fn new(store: &'s dyn PersistedStore) -> Self {
        Self { store }
    }

    pub fn has_permission(&self, role: UserRole, key: &str) -> bool {
        // superAdmin and non-admin roles never consult the matrix
        if role == UserRole::SuperAdmin || !role.is_admin() {
            return has_permission_in(role, key, &PermissionMatrix::default());
        }
        let matrix = load_matrix(self.store);
        let allowed = has_permission_in(role, key, &matrix);
        tracing::debug!(%role, permission = key, allowed, "permission evaluated");
        allowed
    }

    pub fn has_admin_level(&self, role: UserRole, min_level: AdminRole) -> bool {
        has_admin_level(role, min_level)
    }
}

/// Readiness-aware permission queries for a single session snapshot.
pub struct Permissions<'s> {
    snapshot: SessionSnapshot,
    authorizer: Authorizer<'s>,
}

impl<'s> Permissions<'s> {
    pub fn new(snapshot: SessionSnapshot, store: &'s dyn PersistedStore) -> Self {
        Self {
            snapshot,
            authorizer: Authorizer::new(store),
        }
    }

    pub fn ready(&self) -> bool {
        self.snapshot.ready
    }

    pub fn current_role(&self) -> UserRole {
        self.snapshot.role
    }

    pub fn has_permission(&self, key: &str) -> bool {
        self.ready() && self.authorizer.has_permission(self.snapshot.role, key)
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.ready() && self.snapshot.role == role
    }

    pub fn has_any_permission(&self, keys: &[&str]) -> bool {
        self.ready() && keys.iter().any(|key| self.has_permission(key))
    }

    pub fn has_all_permissions(&self, keys: &[&str]) -> bool {
        self.ready() && keys.iter().all(|key| self.has_permission(key))
    }

    /// Admin-class membership only. Not gated on readiness: before ready the
    /// role is pinned to guest, so this is already `false`.
    pub fn is_admin(&self) -> bool {
        self.snapshot.role.is_admin()
    }

    pub fn has_admin_level(&self, min_level: AdminRole) -> bool {
        self.ready() && self.authorizer.has_admin_level(self.snapshot.role, min_level)
    }
}
