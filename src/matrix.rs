//! Permission matrix: permission key × admin role → grant.
//!
//! The compiled default can be replaced wholesale by an override held in the
//! persisted store. There is no field-level merge: a parseable override wins
//! completely, anything else falls back to the default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::PERMISSIONS;
use crate::errors::GateResult;
use crate::role::AdminRole;
use crate::store::{CookieOptions, PersistedStore, MATRIX_KEY};

/// Per-admin-role grants for a single permission. Missing fields are `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleGrants {
    #[serde(default)]
    pub auditor: bool,
    #[serde(default)]
    pub editor: bool,
    #[serde(default)]
    pub super_admin: bool,
}

impl RoleGrants {
    pub const fn new(auditor: bool, editor: bool, super_admin: bool) -> Self {
        Self {
            auditor,
            editor,
            super_admin,
        }
    }

    pub fn get(&self, role: AdminRole) -> bool {
        match role {
            AdminRole::Auditor => self.auditor,
            AdminRole::Editor => self.editor,
            AdminRole::SuperAdmin => self.super_admin,
        }
    }

    pub fn set(&mut self, role: AdminRole, enabled: bool) {
        match role {
            AdminRole::Auditor => self.auditor = enabled,
            AdminRole::Editor => self.editor = enabled,
            AdminRole::SuperAdmin => self.super_admin = enabled,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMatrix(BTreeMap<String, RoleGrants>);

const DEFAULT_GRANTS: &[(&str, RoleGrants)] = &[
    ("users:read", RoleGrants::new(true, true, true)),
    ("users:create", RoleGrants::new(false, true, true)),
    ("users:update", RoleGrants::new(false, true, true)),
    ("users:delete", RoleGrants::new(false, false, true)),
    ("users:export", RoleGrants::new(true, false, true)),
    ("settings:access", RoleGrants::new(false, false, true)),
    ("permissions:read", RoleGrants::new(false, false, true)),
    ("permissions:update", RoleGrants::new(false, false, true)),
    ("webhooks:read", RoleGrants::new(false, false, true)),
    ("webhooks:update", RoleGrants::new(false, false, true)),
];

impl PermissionMatrix {
    pub fn compiled_default() -> Self {
        Self(
            DEFAULT_GRANTS
                .iter()
                .map(|(key, grants)| (key.to_string(), *grants))
                .collect(),
        )
    }

    /// `matrix[key][role] ?? false`
    pub fn granted(&self, key: &str, role: AdminRole) -> bool {
        self.0.get(key).is_some_and(|grants| grants.get(role))
    }

    pub fn grants(&self, key: &str) -> Option<&RoleGrants> {
        self.0.get(key)
    }

    /// Every catalog permission has an entry.
    pub fn covers_catalog(&self) -> bool {
        PERMISSIONS.iter().all(|p| self.0.contains_key(p.key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleGrants)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> GateResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Effective matrix: the persisted override if present and parseable,
/// otherwise the compiled default.
pub fn load_matrix(store: &dyn PersistedStore) -> PermissionMatrix {
    let Some(raw) = store.get(MATRIX_KEY) else {
        return PermissionMatrix::compiled_default();
    };
    match serde_json::from_str::<PermissionMatrix>(&raw) {
        Ok(matrix) => matrix,
        Err(e) => {
            tracing::warn!("ignoring malformed permission matrix override: {e}");
            PermissionMatrix::compiled_default()
        }
    }
}

/// Overwrite the persisted override with the full matrix.
pub fn save_matrix(
    store: &dyn PersistedStore,
    matrix: &PermissionMatrix,
    options: &CookieOptions,
) -> GateResult<()> {
    store.set(MATRIX_KEY, &matrix.to_json()?, options)?;
    tracing::info!(entries = matrix.len(), "permission matrix saved");
    Ok(())
}

/// A copy of `matrix` with exactly one cell changed.
pub fn toggle(
    matrix: &PermissionMatrix,
    key: &str,
    role: AdminRole,
    enabled: bool,
) -> PermissionMatrix {
    let mut next = matrix.clone();
    next.0.entry(key.to_string()).or_default().set(role, enabled);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CookieJar;

    #[test]
    fn default_covers_catalog() {
        let matrix = PermissionMatrix::compiled_default();
        assert!(matrix.covers_catalog());
        assert_eq!(matrix.len(), PERMISSIONS.len());
        assert!(matrix.granted("users:export", AdminRole::Auditor));
        assert!(!matrix.granted("users:export", AdminRole::Editor));
        assert!(!matrix.granted("no:such", AdminRole::SuperAdmin));
    }

    #[test]
    fn json_shape_matches_cookie_format() {
        let json = PermissionMatrix::compiled_default().to_json().unwrap();
        assert!(json.contains(r#""users:read":{"auditor":true,"editor":true,"superAdmin":true}"#));
    }

    #[test]
    fn missing_fields_default_to_false() {
        let matrix: PermissionMatrix =
            serde_json::from_str(r#"{"users:read":{"auditor":true}}"#).unwrap();
        assert!(matrix.granted("users:read", AdminRole::Auditor));
        assert!(!matrix.granted("users:read", AdminRole::Editor));
        assert!(!matrix.covers_catalog());
    }

    #[test]
    fn load_falls_back_on_absent_or_malformed() {
        let jar = CookieJar::new();
        assert_eq!(load_matrix(&jar), PermissionMatrix::compiled_default());

        let jar = CookieJar::from_cookie_header("permissionMatrix={not json");
        assert_eq!(load_matrix(&jar), PermissionMatrix::compiled_default());
    }

    #[test]
    fn override_replaces_default_entirely() {
        let jar = CookieJar::from_cookie_header(r#"permissionMatrix={"users:delete":{"editor":true}}"#);
        let matrix = load_matrix(&jar);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.granted("users:delete", AdminRole::Editor));
        // users:read is granted by default, but not by this override
        assert!(!matrix.granted("users:read", AdminRole::Auditor));
    }

    #[test]
    fn save_then_load_reproduces_matrix() {
        let jar = CookieJar::new();
        let edited = toggle(
            &PermissionMatrix::compiled_default(),
            "webhooks:read",
            AdminRole::Auditor,
            true,
        );
        save_matrix(&jar, &edited, &CookieOptions::session_default()).unwrap();
        assert_eq!(load_matrix(&jar), edited);
    }

    #[test]
    fn toggle_changes_exactly_one_cell() {
        let base = PermissionMatrix::compiled_default();
        let next = toggle(&base, "users:delete", AdminRole::Editor, true);

        let changed: Vec<_> = base
            .iter()
            .filter(|(key, grants)| next.grants(key) != Some(*grants))
            .map(|(key, _)| key)
            .collect();
        assert_eq!(changed, vec!["users:delete"]);
        assert!(next.granted("users:delete", AdminRole::Editor));
        assert!(!base.granted("users:delete", AdminRole::Editor));
    }

    #[test]
    fn toggle_adds_missing_entry() {
        let next = toggle(&PermissionMatrix::default(), "users:read", AdminRole::Auditor, true);
        assert_eq!(next.grants("users:read"), Some(&RoleGrants::new(true, false, false)));
    }
}
