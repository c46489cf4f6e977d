//! Error types for the rolegate authorization core
//!
//! Evaluation itself never fails: every query degrades to "deny". The errors
//! here cover the edges around it (persistence, configuration, parsing of
//! role tokens and illegal workflow transitions).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the rolegate crate
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store operation failed: {operation} - {source}")]
    Store {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unrecognized role: {value}")]
    InvalidRole { value: String },

    #[error("Unknown permission: {key}")]
    UnknownPermission { key: String },

    #[error("Invalid transition: cannot {action} while {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Lock poisoned: {resource}")]
    LockPoisoned { resource: String },
}

/// Shorthand for results carrying a [`GateError`]
pub type GateResult<T> = Result<T, GateError>;

impl GateError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a serialization error
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_role(value: impl Into<String>) -> Self {
        Self::InvalidRole {
            value: value.into(),
        }
    }

    pub fn unknown_permission(key: impl Into<String>) -> Self {
        Self::UnknownPermission { key: key.into() }
    }

    /// Create an invalid state-machine transition error
    pub fn invalid_transition(state: impl Into<String>, action: impl Into<String>) -> Self {
        Self::InvalidTransition {
            state: state.into(),
            action: action.into(),
        }
    }
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        let status = match self {
            GateError::Config { .. }
            | GateError::Serialization { .. }
            | GateError::InvalidRole { .. } => StatusCode::BAD_REQUEST,
            GateError::UnknownPermission { .. } => StatusCode::NOT_FOUND,
            GateError::InvalidTransition { .. } => StatusCode::CONFLICT,
            GateError::Store { .. } | GateError::LockPoisoned { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

/// Helper trait for RwLock read access without panicking on poison
pub trait SafeReadLock<T: ?Sized> {
    fn safe_read(&self) -> GateResult<std::sync::RwLockReadGuard<'_, T>>;
}

impl<T: ?Sized> SafeReadLock<T> for std::sync::RwLock<T> {
    fn safe_read(&self) -> GateResult<std::sync::RwLockReadGuard<'_, T>> {
        self.read().map_err(|_| GateError::LockPoisoned {
            resource: "rwlock_read".to_string(),
        })
    }
}

/// Helper trait for RwLock write access without panicking on poison
pub trait SafeWriteLock<T: ?Sized> {
    fn safe_write(&self) -> GateResult<std::sync::RwLockWriteGuard<'_, T>>;
}

impl<T: ?Sized> SafeWriteLock<T> for std::sync::RwLock<T> {
    fn safe_write(&self) -> GateResult<std::sync::RwLockWriteGuard<'_, T>> {
        self.write().map_err(|_| GateError::LockPoisoned {
            resource: "rwlock_write".to_string(),
        })
    }
}

impl From<sled::Error> for GateError {
    fn from(err: sled::Error) -> Self {
        GateError::store("sled_operation", err)
    }
}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::serialization("json_operation", err)
    }
}

impl From<figment::Error> for GateError {
    fn from(err: figment::Error) -> Self {
        GateError::config(err.to_string())
    }
}
