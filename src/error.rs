//! Error taxonomy shared by every core operation.
//!
//! No error is fatal: operations return `Result<_, CoreError>` and the
//! transaction wrapper rolls back all partial writes on the error path.

use crate::money::Money;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad or missing input; nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The actor is not permitted to perform the operation.
    #[error("{0}")]
    Authorization(String),

    /// The target is not in a state that allows the operation.
    #[error("{0}")]
    StateConflict(String),

    /// Wallet balance too low; carries the exact shortfall.
    #[error("Insufficient wallet balance. You need {0} more.")]
    InsufficientFunds(Money),

    /// Connection or transaction failure; all partial writes rolled back.
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),
}

impl CoreError {
    fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION",
            CoreError::Authorization(_) => "FORBIDDEN",
            CoreError::StateConflict(_) => "STATE_CONFLICT",
            CoreError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            CoreError::Store(_) => "STORE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Authorization(_) => StatusCode::FORBIDDEN,
            CoreError::StateConflict(_) => StatusCode::CONFLICT,
            CoreError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
