use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api_errors::AppError;
use crate::role::UserRole;
use crate::store::{cookie_value, ROLE_KEY};

/// Path falls under `prefix` (plain string prefix, as the router sees it).
pub fn is_protected_path(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Forward,
    NotFound,
}

/// Pre-render gate for the protected area.
///
/// Only admin-class membership is checked here; fine-grained permissions are
/// left to view guards once the page renders.
#[derive(Debug, Clone)]
pub struct EdgeGate {
    protected_prefix: String,
}

impl EdgeGate {
    pub fn new(protected_prefix: impl Into<String>) -> Self {
        Self {
            protected_prefix: protected_prefix.into(),
        }
    }

    pub fn decide(&self, path: &str, role_token: Option<&str>) -> GateDecision {
        if !is_protected_path(path, &self.protected_prefix) {
            return GateDecision::Forward;
        }
        let is_admin = role_token
            .and_then(|token| token.parse::<UserRole>().ok())
            .is_some_and(UserRole::is_admin);
        if is_admin {
            GateDecision::Forward
        } else {
            GateDecision::NotFound
        }
    }
}

impl Default for EdgeGate {
    fn default() -> Self {
        Self::new("/admin")
    }
}

/// Axum middleware: reads the role token from the request's `Cookie` header
/// and hides the protected area from non-admins behind a 404.
pub async fn admin_gate(State(gate): State<Arc<EdgeGate>>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let token = req
        .headers()
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|header| cookie_value(header, ROLE_KEY))
        .map(str::to_string);

    match gate.decide(&path, token.as_deref()) {
        GateDecision::Forward => {
            tracing::debug!(%path, role = ?token, "gate forwarding request");
            next.run(req).await
        }
        GateDecision::NotFound => {
            tracing::warn!(%path, role = ?token, "gate hiding protected route");
            AppError::not_found("not found").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_paths_always_forward() {
        let gate = EdgeGate::default();
        assert_eq!(gate.decide("/", None), GateDecision::Forward);
        assert_eq!(gate.decide("/api/role", Some("guest")), GateDecision::Forward);
    }

    #[test]
    fn protected_paths_require_admin_class() {
        let gate = EdgeGate::default();
        assert_eq!(gate.decide("/admin/users", None), GateDecision::NotFound);
        assert_eq!(gate.decide("/admin/users", Some("customer")), GateDecision::NotFound);
        assert_eq!(gate.decide("/admin/users", Some("guest")), GateDecision::NotFound);
        assert_eq!(gate.decide("/admin/users", Some("SUPERADMIN")), GateDecision::NotFound);
        assert_eq!(gate.decide("/admin/users", Some("auditor")), GateDecision::Forward);
        assert_eq!(gate.decide("/admin", Some("editor")), GateDecision::Forward);
        assert_eq!(gate.decide("/admin/settings", Some("superAdmin")), GateDecision::Forward);
    }

    #[test]
    fn custom_prefix() {
        let gate = EdgeGate::new("/console");
        assert_eq!(gate.decide("/admin/users", None), GateDecision::Forward);
        assert_eq!(gate.decide("/console/users", None), GateDecision::NotFound);
    }
}
