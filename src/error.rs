//! Application error type and its JSON rendering.

use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

pub const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by field name, rendered as `{field: [messages]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("Given token not valid for any token type")]
    InvalidToken,

    #[error("You do not have permission to perform this action.")]
    PermissionDenied,

    #[error("Not found.")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::NotAuthenticated | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::PermissionDenied => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => json!(errors),
            AppError::BadRequest(msg) => json!({ "error": msg }),
            AppError::MalformedBody(msg) => json!({ "detail": msg }),
            AppError::InvalidCredentials => json!({ "message": self.to_string() }),
            AppError::NotAuthenticated
            | AppError::InvalidToken
            | AppError::PermissionDenied
            | AppError::NotFound => json!({ "detail": self.to_string() }),
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                json!({ "detail": "A server error occurred." })
            }
        };

        let mut res = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED && !matches!(self, AppError::InvalidCredentials) {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

/// Store failures that callers must tell apart from plain infrastructure errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate value for {0}")]
    Conflict(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Other(e.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
