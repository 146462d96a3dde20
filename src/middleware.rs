use std::{any::Any, panic::AssertUnwindSafe};

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use futures::FutureExt;
use serde::Serialize;
use tracing::{error, warn};

/// A failure intercepted on its way out of the handler chain.
#[derive(Debug, Clone)]
pub struct Failure {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
    /// Messages of the source chain, outermost first.
    pub causes: Vec<String>,
}

/// Client-visible error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Failure {
    pub fn from_error(
        status: StatusCode,
        kind: &'static str,
        err: &(dyn std::error::Error + 'static),
    ) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }
        Self {
            status,
            kind,
            message: err.to_string(),
            causes,
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "handler panicked".to_string()
        };
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "UnhandledFailure",
            message,
            causes: Vec::new(),
        }
    }

    fn log(&self, method: &str, path: &str) {
        if self.status.is_server_error() {
            error!(%method, %path, status = %self.status, kind = self.kind, error = %self.message, "request failed");
        } else {
            warn!(%method, %path, status = %self.status, kind = self.kind, error = %self.message, "request failed");
        }

        if let Some((first, rest)) = self.causes.split_first() {
            let chain = rest.join(": ");
            if self.status.is_server_error() {
                error!(%method, %path, cause = %first, chain = %chain, "caused by");
            } else {
                warn!(%method, %path, cause = %first, chain = %chain, "caused by");
            }
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
            kind: self.kind.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Outermost failure boundary of the router.
///
/// Runs the rest of the chain, and for any `Failure` left in the response
/// extensions or any panic raised while producing the response, logs it once
/// and answers with a JSON `{ message, type }` body. Never rethrows.
pub async fn request_guard(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let mut res = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => {
            let failure = Failure::from_panic(payload);
            failure.log(&method, &path);
            return failure.into_response();
        }
    };

    match res.extensions_mut().remove::<Failure>() {
        Some(failure) => {
            failure.log(&method, &path);
            failure.into_response()
        }
        None => res,
    }
}
