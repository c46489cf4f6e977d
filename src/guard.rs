use crate::evaluator::Permissions;
use crate::role::{AdminRole, UserRole};

/// Outcome of a view guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not ready; render neither branch.
    Pending,
    Allowed,
    Denied,
}

/// Conditional subtree guard.
///
/// Checks run in a fixed order (permission, then admin level, then exact
/// role) and stop at the first failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Guard {
    permission: Option<String>,
    admin_level: Option<AdminRole>,
    role: Option<UserRole>,
}

impl Guard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permission(mut self, key: impl Into<String>) -> Self {
        self.permission = Some(key.into());
        self
    }

    pub fn admin_level(mut self, level: AdminRole) -> Self {
        self.admin_level = Some(level);
        self
    }

    pub fn role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn evaluate(&self, perms: &Permissions<'_>) -> GuardDecision {
        if !perms.ready() {
            return GuardDecision::Pending;
        }
        if let Some(key) = &self.permission {
            if !perms.has_permission(key) {
                return GuardDecision::Denied;
            }
        }
        if let Some(level) = self.admin_level {
            if !perms.has_admin_level(level) {
                return GuardDecision::Denied;
            }
        }
        if let Some(role) = self.role {
            if !perms.has_role(role) {
                return GuardDecision::Denied;
            }
        }
        GuardDecision::Allowed
    }

    /// Render `allowed` or `fallback` according to [`Guard::evaluate`].
    /// Returns `None` while pending, or when denied without a fallback.
    pub fn render<T, A, F>(&self, perms: &Permissions<'_>, allowed: A, fallback: Option<F>) -> Option<T>
    where
        A: FnOnce() -> T,
        F: FnOnce() -> T,
    {
        match self.evaluate(perms) {
            GuardDecision::Pending => None,
            GuardDecision::Allowed => Some(allowed()),
            GuardDecision::Denied => fallback.map(|f| f()),
        }
    }

    /// [`Guard::render`] without a fallback branch.
    pub fn show<T>(&self, perms: &Permissions<'_>, allowed: impl FnOnce() -> T) -> Option<T> {
        self.render(perms, allowed, None::<fn() -> T>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionSnapshot;
    use crate::store::CookieJar;

    fn perms(jar: &CookieJar, role: UserRole, ready: bool) -> Permissions<'_> {
        Permissions::new(SessionSnapshot { role, ready }, jar)
    }

    #[test]
    fn pending_renders_nothing() {
        let jar = CookieJar::new();
        let p = perms(&jar, UserRole::SuperAdmin, false);
        let guard = Guard::new();
        assert_eq!(guard.evaluate(&p), GuardDecision::Pending);
        assert_eq!(guard.render(&p, || "allowed", Some(|| "fallback")), None);
    }

    #[test]
    fn empty_guard_allows_ready_session() {
        let jar = CookieJar::new();
        let p = perms(&jar, UserRole::Guest, true);
        assert_eq!(Guard::new().show(&p, || 1), Some(1));
    }

    #[test]
    fn denied_uses_fallback_or_nothing() {
        let jar = CookieJar::new();
        let p = perms(&jar, UserRole::Auditor, true);
        let guard = Guard::new().permission("users:delete");
        assert_eq!(guard.render(&p, || "delete", Some(|| "read-only")), Some("read-only"));
        assert_eq!(guard.show(&p, || "delete"), None);
    }

    #[test]
    fn checks_short_circuit_in_order() {
        let jar = CookieJar::new();
        let p = perms(&jar, UserRole::Editor, true);

        // permission passes, admin level fails
        let guard = Guard::new()
            .permission("users:create")
            .admin_level(AdminRole::SuperAdmin);
        assert_eq!(guard.evaluate(&p), GuardDecision::Denied);

        // permission and level pass, exact role fails
        let guard = Guard::new()
            .permission("users:create")
            .admin_level(AdminRole::Auditor)
            .role(UserRole::Auditor);
        assert_eq!(guard.evaluate(&p), GuardDecision::Denied);

        let guard = Guard::new()
            .permission("users:create")
            .admin_level(AdminRole::Auditor)
            .role(UserRole::Editor);
        assert_eq!(guard.evaluate(&p), GuardDecision::Allowed);
    }
}
