//! HTTP surface.
//!
//! Every request gets its own cookie jar seeded from the `Cookie` header and
//! its own hydrated session; nothing mutable is shared between requests.
//! Writes made while handling a request come back as `Set-Cookie` headers.

use axum::{
    extract::{Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap,
    },
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::api_errors::AppError;
use crate::catalog::{permission, role_definition};
use crate::config::GateConfig;
use crate::edge_gate::{admin_gate, EdgeGate};
use crate::editor::{MatrixEditor, PermissionGroup};
use crate::errors::GateError;
use crate::guard::Guard;
use crate::matrix::PermissionMatrix;
use crate::role::{AdminRole, UserRole};
use crate::session::{Navigator, RoleChange, Session, SessionHandle};
use crate::store::CookieJar;

pub struct AppState {
    pub config: GateConfig,
}

impl AppState {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Cookie jar and ready session for one request.
    fn request_session(&self, headers: &HeaderMap) -> Result<(CookieJar, SessionHandle), AppError> {
        let jar = headers
            .get(COOKIE)
            .and_then(|v| v.to_str().ok())
            .map(CookieJar::from_cookie_header)
            .unwrap_or_default();
        let session = Session::shared(self.config.session_policy());
        session.hydrate(Some(&jar))?;
        Ok((jar, session))
    }
}

fn set_cookie_headers(jar: &CookieJar) -> Result<AppendHeaders<Vec<(axum::http::HeaderName, String)>>, AppError> {
    let cookies = jar.take_set_cookies()?;
    Ok(AppendHeaders(
        cookies.into_iter().map(|c| (SET_COOKIE, c)).collect(),
    ))
}

pub fn build_router(config: GateConfig) -> Router {
    let prefix = config.protected_prefix.clone();
    let gate = Arc::new(EdgeGate::new(prefix.clone()));
    let state = Arc::new(AppState::new(config));

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/api/role", post(change_role))
        .route(&prefix, get(admin_dashboard))
        .route(&format!("{prefix}/users"), get(users_page))
        .route(&format!("{prefix}/settings"), get(settings_page))
        .route(
            &format!("{prefix}/permissions"),
            get(permissions_page).put(update_permissions),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(gate, admin_gate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(config: GateConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("rolegate listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found() -> AppError {
    AppError::not_found("not found")
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub role: UserRole,
    pub role_name: Option<&'static str>,
    pub ready: bool,
    pub is_admin: bool,
    pub admin_link: Option<String>,
}

async fn home(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<HomeView>, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    let perms = session.permissions(&jar);
    let admin_link = Guard::new()
        .admin_level(AdminRole::Auditor)
        .show(&perms, || st.config.protected_prefix.clone());

    Ok(Json(HomeView {
        role: perms.current_role(),
        role_name: role_definition(perms.current_role()).map(|d| d.name),
        ready: perms.ready(),
        is_admin: perms.is_admin(),
        admin_link,
    }))
}

#[derive(Debug, Serialize)]
pub struct Panel {
    pub title: &'static str,
    pub href: String,
}

async fn admin_dashboard(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Panel>>, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    let perms = session.permissions(&jar);
    let prefix = &st.config.protected_prefix;

    let panels = [
        ("Users", "users", "users:read"),
        ("Settings", "settings", "settings:access"),
        ("Permissions", "permissions", "permissions:read"),
    ]
    .into_iter()
    .filter_map(|(title, slug, key)| {
        Guard::new().permission(key).show(&perms, || Panel {
            title,
            href: format!("{prefix}/{slug}"),
        })
    })
    .collect();

    Ok(Json(panels))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActions {
    pub create: bool,
    pub update: bool,
    pub delete: bool,
    pub export: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum UsersView {
    Table { actions: UserActions },
    NoAccess { message: &'static str },
}

async fn users_page(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UsersView>, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    let perms = session.permissions(&jar);
    let can = |key: &str| Guard::new().permission(key).show(&perms, || ()).is_some();

    let view = Guard::new()
        .permission("users:read")
        .render(
            &perms,
            || UsersView::Table {
                actions: UserActions {
                    create: can("users:create"),
                    update: can("users:update"),
                    delete: can("users:delete"),
                    export: can("users:export"),
                },
            },
            Some(|| UsersView::NoAccess {
                message: "You do not have permission to view users",
            }),
        )
        .ok_or_else(|| AppError::internal("session not ready"))?;

    Ok(Json(view))
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum SettingsView {
    #[serde(rename_all = "camelCase")]
    Settings {
        permissions: Option<Vec<PermissionGroup>>,
        webhooks_editable: Option<bool>,
    },
    AccessDenied { message: &'static str },
}

async fn settings_page(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SettingsView>, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    let perms = session.permissions(&jar);
    let editor = MatrixEditor::open(&jar, st.config.cookie_options());

    let view = Guard::new()
        .permission("settings:access")
        .render(
            &perms,
            || SettingsView::Settings {
                permissions: Guard::new()
                    .permission("permissions:read")
                    .show(&perms, || editor.rows("")),
                webhooks_editable: Guard::new()
                    .permission("webhooks:read")
                    .show(&perms, || perms.has_permission("webhooks:update")),
            },
            Some(|| SettingsView::AccessDenied {
                message: "You do not have access to system settings",
            }),
        )
        .ok_or_else(|| AppError::internal("session not ready"))?;

    Ok(Json(view))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsView {
    pub admin_roles: [AdminRole; 3],
    pub groups: Vec<PermissionGroup>,
    pub can_edit: bool,
}

async fn permissions_page(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<PermissionsView>, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    let perms = session.permissions(&jar);
    if !perms.has_permission("permissions:read") {
        return Err(AppError::forbidden("permissions:read required"));
    }
    let editor = MatrixEditor::open(&jar, st.config.cookie_options());

    Ok(Json(PermissionsView {
        admin_roles: AdminRole::HIERARCHY,
        groups: editor.rows(&params.q),
        can_edit: perms.has_permission("permissions:update"),
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionChange {
    pub permission: String,
    pub role: AdminRole,
    pub enabled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub changes: Vec<PermissionChange>,
}

async fn update_permissions(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdatePermissionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (jar, session) = st.request_session(&headers)?;
    if !session.permissions(&jar).has_permission("permissions:update") {
        return Err(AppError::forbidden("permissions:update required"));
    }

    if req.changes.is_empty() {
        return Err(AppError::bad_request("no changes submitted"));
    }

    let mut editor = MatrixEditor::open(&jar, st.config.cookie_options());
    for change in &req.changes {
        if permission(&change.permission).is_none() {
            return Err(GateError::unknown_permission(&change.permission).into());
        }
        editor.toggle(&change.permission, change.role, change.enabled)?;
    }
    editor.save(st.config.save_latency()).await?;
    let matrix: PermissionMatrix = editor.matrix().clone();

    Ok((set_cookie_headers(&jar)?, Json(matrix)))
}

/// Navigation target captured from a role change request.
struct RequestNavigator {
    location: String,
    redirect: RefCell<Option<String>>,
}

impl Navigator for RequestNavigator {
    fn current_path(&self) -> String {
        self.location.clone()
    }

    fn navigate_full(&self, path: &str) {
        *self.redirect.borrow_mut() = Some(path.to_string());
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleChangeRequest {
    pub role: String,
    #[serde(default = "default_location")]
    pub location: String,
}

fn default_location() -> String {
    "/".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleChangeResponse {
    pub role: UserRole,
    pub redirect: Option<String>,
}

async fn change_role(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RoleChangeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_role: UserRole = req.role.parse()?;
    let (jar, session) = st.request_session(&headers)?;
    let navigator = RequestNavigator {
        location: req.location,
        redirect: RefCell::new(None),
    };

    let change = session.set_role(new_role, &jar, &navigator)?;
    let redirect = match change {
        RoleChange::Redirected { location, .. } => Some(location),
        RoleChange::Updated { .. } => navigator.redirect.into_inner(),
    };

    Ok((
        set_cookie_headers(&jar)?,
        Json(RoleChangeResponse {
            role: new_role,
            redirect,
        }),
    ))
}
