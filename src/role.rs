use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::GateError;

/// Every role a visitor can hold.
///
/// The wire spelling (cookie value, JSON) is the camelCase variant name:
/// `guest`, `customer`, `auditor`, `editor`, `superAdmin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    #[default]
    Guest,
    Customer,
    Auditor,
    Editor,
    SuperAdmin,
}

/// The admin subset of [`UserRole`], listed in ascending privilege.
///
/// Only admin roles have matrix entries and may enter the protected area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdminRole {
    Auditor,
    Editor,
    SuperAdmin,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::Guest,
        UserRole::Customer,
        UserRole::Auditor,
        UserRole::Editor,
        UserRole::SuperAdmin,
    ];

    /// Narrow to the admin refinement; `None` for guest and customer.
    pub fn as_admin(self) -> Option<AdminRole> {
        match self {
            UserRole::Auditor => Some(AdminRole::Auditor),
            UserRole::Editor => Some(AdminRole::Editor),
            UserRole::SuperAdmin => Some(AdminRole::SuperAdmin),
            UserRole::Guest | UserRole::Customer => None,
        }
    }

    pub fn is_admin(self) -> bool {
        self.as_admin().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Guest => "guest",
            UserRole::Customer => "customer",
            UserRole::Auditor => "auditor",
            UserRole::Editor => "editor",
            UserRole::SuperAdmin => "superAdmin",
        }
    }
}

impl AdminRole {
    /// Hierarchy order, also used as display order.
    pub const HIERARCHY: [AdminRole; 3] =
        [AdminRole::Auditor, AdminRole::Editor, AdminRole::SuperAdmin];

    pub fn level(self) -> usize {
        match self {
            AdminRole::Auditor => 0,
            AdminRole::Editor => 1,
            AdminRole::SuperAdmin => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        UserRole::from(self).as_str()
    }
}

impl From<AdminRole> for UserRole {
    fn from(role: AdminRole) -> Self {
        match role {
            AdminRole::Auditor => UserRole::Auditor,
            AdminRole::Editor => UserRole::Editor,
            AdminRole::SuperAdmin => UserRole::SuperAdmin,
        }
    }
}

impl FromStr for UserRole {
    type Err = GateError;

    fn from_str(input: &str) -> Result<UserRole, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.as_str() == input)
            .ok_or_else(|| GateError::invalid_role(input))
    }
}

impl FromStr for AdminRole {
    type Err = GateError;

    fn from_str(input: &str) -> Result<AdminRole, Self::Err> {
        input
            .parse::<UserRole>()?
            .as_admin()
            .ok_or_else(|| GateError::invalid_role(input))
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_spelling_exactly() {
        assert_eq!("superAdmin".parse::<UserRole>().unwrap(), UserRole::SuperAdmin);
        assert_eq!("guest".parse::<UserRole>().unwrap(), UserRole::Guest);
        assert!("superadmin".parse::<UserRole>().is_err());
        assert!("admin".parse::<UserRole>().is_err());
        assert!("".parse::<UserRole>().is_err());
    }

    #[test]
    fn narrowing_is_total() {
        let admins: Vec<AdminRole> = UserRole::ALL.iter().filter_map(|r| r.as_admin()).collect();
        assert_eq!(admins, AdminRole::HIERARCHY.to_vec());
        assert!(!UserRole::Customer.is_admin());

        for admin in AdminRole::HIERARCHY {
            assert_eq!(UserRole::from(admin).as_admin(), Some(admin));
        }
    }

    #[test]
    fn admin_parse_rejects_non_admin() {
        assert_eq!("editor".parse::<AdminRole>().unwrap(), AdminRole::Editor);
        assert!("customer".parse::<AdminRole>().is_err());
    }

    #[test]
    fn serde_matches_display() {
        for role in UserRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
        }
    }

    #[test]
    fn hierarchy_is_ascending() {
        assert!(AdminRole::Auditor < AdminRole::Editor);
        assert!(AdminRole::Editor < AdminRole::SuperAdmin);
        assert_eq!(AdminRole::SuperAdmin.level(), 2);
    }
}
