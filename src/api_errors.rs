use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::errors::GateError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            AppError::Forbidden(s) => (StatusCode::FORBIDDEN, s),
            AppError::NotFound(s) => (StatusCode::NOT_FOUND, s),
            AppError::Conflict(s) => (StatusCode::CONFLICT, s),
            AppError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
        };
        (code, Json(ErrBody { error: msg.clone() })).into_response()
    }
}

impl From<GateError> for AppError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Config { message } => AppError::Internal(message),
            GateError::Serialization { context, source } => {
                AppError::BadRequest(format!("Serialization {context} failed: {source}"))
            }
            GateError::InvalidRole { value } => {
                AppError::BadRequest(format!("Unrecognized role: {value}"))
            }
            GateError::UnknownPermission { key } => {
                AppError::NotFound(format!("Unknown permission: {key}"))
            }
            e @ GateError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            GateError::Store { operation, source } => {
                AppError::Internal(format!("Store {operation} failed: {source}"))
            }
            GateError::LockPoisoned { resource } => {
                AppError::Internal(format!("Lock for {resource} poisoned"))
            }
        }
    }
}
