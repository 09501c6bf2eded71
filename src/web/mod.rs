//! HTTP surface
//!
//! Every failure leaves as JSON `{ "error", "code" }`. Caller identity is
//! taken from the `x-identity-id` header set by the authenticating edge.

pub mod identity;
pub mod routes;

pub use identity::{IDENTITY_HEADER, OwnerIdentity};
pub use routes::{AppState, router};

use crate::core::JournalError;
use axum::Json;
use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Journal(JournalError),
    Input(String),
    Unauthenticated(String),
    Internal(String),
}

impl From<JournalError> for WebError {
    fn from(err: JournalError) -> Self {
        WebError::Journal(err)
    }
}

impl WebError {
    fn parts(self) -> (StatusCode, String, &'static str) {
        match self {
            WebError::Journal(err) => {
                let (status, code) = match &err {
                    JournalError::MalformedReference(_)
                    | JournalError::UnknownReference(_)
                    | JournalError::ForeignReference(_)
                    | JournalError::InvalidOwner(_)
                    | JournalError::Validation(_) => (StatusCode::BAD_REQUEST, "input_error"),
                    JournalError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                    JournalError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
                    JournalError::Configuration(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
                    }
                    JournalError::Reconcile(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "reconcile_error")
                    }
                    JournalError::Upstream(_) | JournalError::Download(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error")
                    }
                    JournalError::DuplicateProfile(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
                    }
                    JournalError::NotFound(_)
                    | JournalError::Upload { .. }
                    | JournalError::Delete { .. }
                    | JournalError::Storage(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
                    }
                };
                // the category is in `code`; these carry a message meant for the client
                let message = match err {
                    JournalError::Validation(msg) | JournalError::Configuration(msg) => msg,
                    other => other.to_string(),
                };
                (status, message, code)
            }
            WebError::Input(msg) => (StatusCode::BAD_REQUEST, msg, "input_error"),
            WebError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, msg, "unauthenticated"),
            WebError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, "internal_error"),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = self.parts();

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::Input(rejection.body_text())
    }
}

/// JSON body extractor whose rejections leave as `{ error, code }`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(WebError))]
pub struct JsonBody<T>(pub T);

pub type Result<T> = std::result::Result<T, WebError>;
