use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The crate-wide error taxonomy. Every failure a handler can surface maps to
/// exactly one variant here, and every variant maps to one stable HTTP status
/// plus a human-readable `detail` string. Internal errors (database, I/O) are
/// logged with their full cause but never leak internals to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired, or tampered bearer token -- or a failed
    /// login. The detail string is always generic: the client must not be
    /// able to tell which factor failed.
    #[error("{0}")]
    Unauthenticated(&'static str),

    /// A valid identity whose role does not permit the operation.
    #[error("Not enough permissions")]
    Forbidden,

    /// Duplicate unique key on create (e.g. username already registered).
    #[error("{0}")]
    Conflict(String),

    /// The target record id (or a parent id in the norm hierarchy) does not
    /// resolve. Carries the resource display name, e.g. "Law".
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Uploaded file extension is not in the resource's allow-list.
    #[error("File extension {extension} not allowed. Allowed: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    /// Malformed request payload (missing required field, wrong type).
    #[error("{0}")]
    Validation(String),

    /// The outbound notification collaborator failed after the store write.
    #[error("Failed to deliver notification: {0}")]
    Upstream(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            // The original API reports duplicate usernames as 400, and
            // clients depend on that, so Conflict does not use 409.
            ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UnsupportedType { .. } => StatusCode::BAD_REQUEST,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Database(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failures are logged with their cause; the client only
        // ever sees a generic detail string.
        let detail = match &self {
            ApiError::Database(e) => {
                tracing::error!("database error: {e:?}");
                "Internal server error".to_string()
            }
            ApiError::Io(e) => {
                tracing::error!("io error: {e:?}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "detail": detail }))).into_response();

        // 401 responses carry the bearer challenge so clients know which
        // authentication scheme is expected.
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }

        response
    }
}
