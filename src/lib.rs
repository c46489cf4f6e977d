//! Library root for the `rolegate` crate

// Core error handling
pub mod api_errors;
pub mod errors;

// Roles, permissions and the matrix
pub mod catalog;
pub mod matrix;
pub mod role;

// Persisted client state
pub mod store;

// Evaluation and gating
pub mod edge_gate;
pub mod evaluator;
pub mod guard;

// Session & edit workflow
pub mod editor;
pub mod session;

// Configuration & CLI
pub mod cli;
pub mod config;

// Web server interface
pub mod web;

pub use errors::{GateError, GateResult};
pub use evaluator::{has_admin_level, has_permission_in, Authorizer, Permissions};
pub use guard::{Guard, GuardDecision};
pub use matrix::{load_matrix, save_matrix, toggle, PermissionMatrix};
pub use role::{AdminRole, UserRole};
pub use session::{Session, SessionHandle, SessionSnapshot};
