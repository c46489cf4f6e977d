//! Session state and hydration sequencing.
//!
//! A session starts `Uninitialized` with the role pinned to guest so the
//! first render is identical everywhere. `hydrate` runs once, reads the
//! persisted role token and flips the session to `Ready`. Consumers branch on
//! readiness instead of timing.

use std::fmt;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::edge_gate::is_protected_path;
use crate::errors::{GateError, GateResult, SafeReadLock, SafeWriteLock};
use crate::evaluator::Permissions;
use crate::role::UserRole;
use crate::store::{CookieOptions, PersistedStore, ROLE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Ready,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Point-in-time view of a session, cheap to copy into evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub role: UserRole,
    pub ready: bool,
}

impl SessionSnapshot {
    /// Fail-closed placeholder: guest, not ready.
    pub const PROVISIONAL: SessionSnapshot = SessionSnapshot {
        role: UserRole::Guest,
        ready: false,
    };
}

/// Where the active view lives and how to leave it.
pub trait Navigator {
    fn current_path(&self) -> String;

    /// Full navigation that discards the current view.
    fn navigate_full(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// Role updated in place and persisted.
    Updated { from: UserRole, to: UserRole },
    /// Role persisted, then the view was abandoned for `location`.
    Redirected { to: UserRole, location: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub protected_prefix: String,
    pub public_root: String,
    pub cookie: CookieOptions,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            protected_prefix: "/admin".to_string(),
            public_root: "/".to_string(),
            cookie: CookieOptions::session_default(),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    role: UserRole,
    phase: SessionPhase,
}

/// Shared handle, built once at the application root.
pub type SessionHandle = Arc<Session>;

#[derive(Debug)]
pub struct Session {
    pub session_id: Uuid,
    policy: SessionPolicy,
    state: RwLock<SessionState>,
}

impl Session {
    pub fn new(policy: SessionPolicy) -> Self {
        Session {
            session_id: Uuid::new_v4(),
            policy,
            state: RwLock::new(SessionState {
                role: UserRole::Guest,
                phase: SessionPhase::Uninitialized,
            }),
        }
    }

    pub fn shared(policy: SessionPolicy) -> SessionHandle {
        Arc::new(Self::new(policy))
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Resolve the persisted role and become ready. Runs at most once.
    ///
    /// With no store available the session becomes ready as guest.
    pub fn hydrate(&self, store: Option<&dyn PersistedStore>) -> GateResult<UserRole> {
        let mut state = self.state.safe_write()?;
        if state.phase != SessionPhase::Uninitialized {
            return Err(GateError::invalid_transition(
                state.phase.to_string(),
                "hydrate",
            ));
        }
        state.phase = SessionPhase::Initializing;

        let role = match store.and_then(|s| s.get(ROLE_KEY)) {
            Some(token) => token.parse::<UserRole>().unwrap_or_else(|_| {
                tracing::warn!(session = %self.session_id, "ignoring unrecognized role token {token:?}");
                UserRole::Guest
            }),
            None => UserRole::Guest,
        };

        state.role = role;
        state.phase = SessionPhase::Ready;
        tracing::debug!(session = %self.session_id, %role, "session ready");
        Ok(role)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state
            .safe_read()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Uninitialized)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        match self.state.safe_read() {
            Ok(state) => SessionSnapshot {
                role: state.role,
                ready: state.phase == SessionPhase::Ready,
            },
            Err(_) => SessionSnapshot::PROVISIONAL,
        }
    }

    pub fn current_role(&self) -> UserRole {
        self.snapshot().role
    }

    pub fn ready(&self) -> bool {
        self.snapshot().ready
    }

    pub fn permissions<'s>(&self, store: &'s dyn PersistedStore) -> Permissions<'s> {
        Permissions::new(self.snapshot(), store)
    }

    /// The single mutation entry point for the current role.
    ///
    /// Only a ready session can change role; before that the role is pinned
    /// to guest.
    pub fn set_role(
        &self,
        new_role: UserRole,
        store: &dyn PersistedStore,
        navigator: &dyn Navigator,
    ) -> GateResult<RoleChange> {
        let mut state = self.state.safe_write()?;
        if state.phase != SessionPhase::Ready {
            return Err(GateError::invalid_transition(
                state.phase.to_string(),
                "set role",
            ));
        }
        let current = state.role;
        let on_protected_view =
            is_protected_path(&navigator.current_path(), &self.policy.protected_prefix);

        if current.is_admin() && !new_role.is_admin() && on_protected_view {
            store.set(ROLE_KEY, new_role.as_str(), &self.policy.cookie)?;
            tracing::info!(
                session = %self.session_id,
                from = %current,
                to = %new_role,
                "leaving protected area after role change"
            );
            navigator.navigate_full(&self.policy.public_root);
            return Ok(RoleChange::Redirected {
                to: new_role,
                location: self.policy.public_root.clone(),
            });
        }

        store.set(ROLE_KEY, new_role.as_str(), &self.policy.cookie)?;
        state.role = new_role;
        tracing::info!(session = %self.session_id, from = %current, to = %new_role, "role changed");
        Ok(RoleChange::Updated {
            from: current,
            to: new_role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CookieJar;
    use std::cell::RefCell;

    struct FakeNav {
        path: String,
        visits: RefCell<Vec<String>>,
    }

    impl FakeNav {
        fn at(path: &str) -> Self {
            Self {
                path: path.to_string(),
                visits: RefCell::new(Vec::new()),
            }
        }
    }

    impl Navigator for FakeNav {
        fn current_path(&self) -> String {
            self.path.clone()
        }

        fn navigate_full(&self, path: &str) {
            self.visits.borrow_mut().push(path.to_string());
        }
    }

    #[test]
    fn starts_provisional() {
        let session = Session::new(SessionPolicy::default());
        assert_eq!(session.phase(), SessionPhase::Uninitialized);
        assert_eq!(session.snapshot(), SessionSnapshot::PROVISIONAL);
    }

    #[test]
    fn hydrate_adopts_valid_token() {
        let jar = CookieJar::from_cookie_header("userRole=editor");
        let session = Session::new(SessionPolicy::default());
        assert_eq!(session.hydrate(Some(&jar)).unwrap(), UserRole::Editor);
        assert!(session.ready());
        assert_eq!(session.current_role(), UserRole::Editor);
    }

    #[test]
    fn hydrate_rejects_unknown_token() {
        let jar = CookieJar::from_cookie_header("userRole=root");
        let session = Session::new(SessionPolicy::default());
        assert_eq!(session.hydrate(Some(&jar)).unwrap(), UserRole::Guest);
        assert!(session.ready());
    }

    #[test]
    fn hydrate_without_store_is_guest_and_ready() {
        let session = Session::new(SessionPolicy::default());
        assert_eq!(session.hydrate(None).unwrap(), UserRole::Guest);
        assert_eq!(session.phase(), SessionPhase::Ready);
    }

    #[test]
    fn hydrate_runs_once() {
        let jar = CookieJar::from_cookie_header("userRole=auditor");
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&jar)).unwrap();

        let later = CookieJar::from_cookie_header("userRole=superAdmin");
        assert!(matches!(
            session.hydrate(Some(&later)),
            Err(GateError::InvalidTransition { .. })
        ));
        assert_eq!(session.current_role(), UserRole::Auditor);
    }

    struct ReadOnlyStore;

    impl PersistedStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            Some("editor".to_string())
        }

        fn set(&self, key: &str, _value: &str, _options: &CookieOptions) -> GateResult<()> {
            Err(GateError::store(
                format!("write {key}"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }

        fn remove(&self, _key: &str) -> GateResult<()> {
            Ok(())
        }
    }

    #[test]
    fn set_role_refused_until_ready() {
        let jar = CookieJar::new();
        let session = Session::new(SessionPolicy::default());
        let nav = FakeNav::at("/");

        assert!(matches!(
            session.set_role(UserRole::SuperAdmin, &jar, &nav),
            Err(GateError::InvalidTransition { .. })
        ));
        assert_eq!(session.snapshot(), SessionSnapshot::PROVISIONAL);
        assert!(!session.permissions(&jar).is_admin());
        assert_eq!(jar.get(ROLE_KEY), None);
        assert_eq!(jar.pending_writes(), 0);
    }

    #[test]
    fn failed_write_keeps_current_role() {
        let store = ReadOnlyStore;
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&store)).unwrap();
        let nav = FakeNav::at("/");

        assert!(session.set_role(UserRole::Customer, &store, &nav).is_err());
        assert_eq!(session.current_role(), UserRole::Editor);
    }

    #[test]
    fn demotion_on_protected_view_redirects() {
        let jar = CookieJar::from_cookie_header("userRole=superAdmin");
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&jar)).unwrap();
        let nav = FakeNav::at("/admin/users");

        let change = session.set_role(UserRole::Customer, &jar, &nav).unwrap();
        assert_eq!(
            change,
            RoleChange::Redirected {
                to: UserRole::Customer,
                location: "/".to_string()
            }
        );
        assert_eq!(jar.get(ROLE_KEY).as_deref(), Some("customer"));
        assert_eq!(*nav.visits.borrow(), vec!["/".to_string()]);
        // view is being discarded; in-memory role is left alone
        assert_eq!(session.current_role(), UserRole::SuperAdmin);
    }

    #[test]
    fn admin_to_admin_updates_in_place() {
        let jar = CookieJar::from_cookie_header("userRole=superAdmin");
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&jar)).unwrap();
        let nav = FakeNav::at("/admin/users");

        let change = session.set_role(UserRole::Editor, &jar, &nav).unwrap();
        assert_eq!(
            change,
            RoleChange::Updated {
                from: UserRole::SuperAdmin,
                to: UserRole::Editor
            }
        );
        assert_eq!(jar.get(ROLE_KEY).as_deref(), Some("editor"));
        assert!(nav.visits.borrow().is_empty());
        assert_eq!(session.current_role(), UserRole::Editor);
    }

    #[test]
    fn demotion_on_public_view_updates_in_place() {
        let jar = CookieJar::from_cookie_header("userRole=auditor");
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&jar)).unwrap();
        let nav = FakeNav::at("/");

        let change = session.set_role(UserRole::Guest, &jar, &nav).unwrap();
        assert!(matches!(change, RoleChange::Updated { .. }));
        assert_eq!(session.current_role(), UserRole::Guest);
        assert!(nav.visits.borrow().is_empty());
    }

    #[test]
    fn persisted_token_uses_session_cookie_options() {
        let jar = CookieJar::new();
        let session = Session::new(SessionPolicy::default());
        session.hydrate(Some(&jar)).unwrap();
        session
            .set_role(UserRole::Auditor, &jar, &FakeNav::at("/"))
            .unwrap();
        assert_eq!(
            jar.take_set_cookies().unwrap(),
            vec!["userRole=auditor; Path=/; Max-Age=86400".to_string()]
        );
    }
}
