use std::future::Future;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::dto::{AuthenticationResult, LoginRequest, RegisterRequest},
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
}

/// Runs a service call under the configured request timeout. On expiry the
/// call is dropped, which also aborts any write still in flight.
async fn within_deadline<F>(state: &AppState, fut: F) -> Result<AuthenticationResult, AppError>
where
    F: Future<Output = Result<AuthenticationResult, AppError>>,
{
    tokio::time::timeout(state.config.request_timeout, fut)
        .await
        .map_err(|_| AppError::Timeout)?
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<AuthenticationResult>, AppError> {
    let Json(payload) = payload?;
    let result = within_deadline(&state, state.users.register(payload)).await?;
    Ok(Json(result))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthenticationResult>), AppError> {
    let Json(payload) = payload?;
    let result = within_deadline(&state, state.users.login(&payload.email, &payload.password)).await?;
    let status = if result.success() {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };
    Ok((status, Json(result)))
}
