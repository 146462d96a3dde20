use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{auth::repo::RepoError, middleware::Failure};

/// Errors a handler can hand back to the request guard.
///
/// Expected negative outcomes of a login (unknown email, wrong password) are
/// not errors; they come back as a failed `AuthenticationResult`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("email {0} is already registered")]
    Conflict(String),
    #[error("request timed out")]
    Timeout,
    #[error("storage failure")]
    Storage(#[source] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Category reported to clients in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Conflict(_) => "ConflictError",
            AppError::Timeout => "TimeoutError",
            AppError::Storage(_) | AppError::Internal(_) => "InfrastructureError",
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(email) => AppError::Conflict(email),
            RepoError::Storage(source) => AppError::Storage(source),
            RepoError::Credential(e) => AppError::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Leaves the body to the request guard: the response only carries the
/// status and a `Failure` in its extensions.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let failure = Failure::from_error(self.status(), self.kind(), &self);
        let mut res = self.status().into_response();
        res.extensions_mut().insert(failure);
        res
    }
}
