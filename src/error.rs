use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use axum_valid::ValidRejection;
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        gate::{GateError, GatePhase, InvalidTransition},
        join::JoinError,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Join controller refused the alias or the roster write failed.
    #[error(transparent)]
    Join(#[from] JoinError),
    /// Passcode did not have the expected shape.
    #[error("The Family does not recognise that code.")]
    InvalidPassword,
    /// Clearing the roster failed at the store.
    #[error("The roster could not be cleared. Try again.")]
    ClearFailed(#[source] StorageError),
    /// Visitor has not passed the password gate yet.
    #[error("password required")]
    Locked,
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<GateError> for ServiceError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::InvalidPassword => ServiceError::InvalidPassword,
            GateError::InvalidTransition(InvalidTransition {
                from: GatePhase::Locked,
                ..
            }) => ServiceError::Locked,
            GateError::InvalidTransition(InvalidTransition { from, event }) => {
                ServiceError::InvalidState(format!(
                    "{event:?} is not possible while {}",
                    from.as_str()
                ))
            }
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input was refused by a domain rule, with a stable code clients can match on.
    #[error("{message}")]
    Rejected {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
    /// Visitor must pass the gate first.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    fn rejected(status: StatusCode, code: &'static str, message: impl ToString) -> Self {
        AppError::Rejected {
            status,
            code,
            message: message.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Rejected { code, .. } => code,
            AppError::Forbidden(_) => "locked",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Join(join) => {
                let status = match join {
                    JoinError::DuplicateAlias => StatusCode::CONFLICT,
                    JoinError::Failed(_) => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::BAD_REQUEST,
                };
                AppError::rejected(status, join.code(), &join)
            }
            ServiceError::InvalidPassword => {
                AppError::rejected(StatusCode::BAD_REQUEST, "invalid_password", &err)
            }
            ServiceError::ClearFailed(_) => {
                AppError::rejected(StatusCode::SERVICE_UNAVAILABLE, "clear_failed", &err)
            }
            ServiceError::Locked => AppError::Forbidden(err.to_string()),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let first = errors
            .field_errors()
            .into_values()
            .flat_map(|errors| errors.iter())
            .next()
            .cloned();
        match first {
            Some(err) => {
                let message = err
                    .message
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| err.code.to_string());
                AppError::rejected(StatusCode::BAD_REQUEST, validation_code(&err.code), message)
            }
            None => AppError::rejected(StatusCode::BAD_REQUEST, "invalid_input", &errors),
        }
    }
}

impl From<ValidRejection<JsonRejection>> for AppError {
    fn from(rejection: ValidRejection<JsonRejection>) -> Self {
        match rejection {
            ValidRejection::Valid(errors) => errors.into(),
            ValidRejection::Inner(inner) => {
                AppError::rejected(inner.status(), "invalid_body", inner.body_text())
            }
        }
    }
}

fn validation_code(code: &str) -> &'static str {
    match code {
        "alias_too_long" => "alias_too_long",
        "invalid_key" => "invalid_key",
        _ => "invalid_input",
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Rejected { status, .. } => *status,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            code: self.code(),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
