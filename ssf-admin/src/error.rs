//! HTTP error mapping
//!
//! Every handler failure becomes `{"ok": false, "error": CODE, "message": ...}`
//! with a status matching the failure class. Row-level import errors also
//! carry the failing CSV line in `"row"`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use ssf_common::Error;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Common(#[from] Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Common(Error::Database(e))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn classify_database(e: &sqlx::Error) -> (StatusCode, &'static str) {
    match e {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            (StatusCode::CONFLICT, "CONFLICT")
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_check_violation() => {
            (StatusCode::BAD_REQUEST, "CONSTRAINT_VIOLATION")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut row = None;
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Common(e) => match e {
                Error::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                Error::Csv(_) => (StatusCode::BAD_REQUEST, "INVALID_CSV"),
                Error::Row { row: line, .. } => {
                    row = Some(*line);
                    (StatusCode::BAD_REQUEST, "INVALID_ROW")
                }
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::Database(db) => classify_database(db),
                Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let mut body = json!({
            "ok": false,
            "error": code,
            "message": self.to_string(),
        });
        if let Some(row) = row {
            body["row"] = json!(row);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ApiError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (Error::NotFound("pillar 1".into()).into(), StatusCode::NOT_FOUND),
            (Error::Validation("x".into()).into(), StatusCode::BAD_REQUEST),
            (
                Error::Row { row: 3, message: "x".into() }.into(),
                StatusCode::BAD_REQUEST,
            ),
            (Error::Internal("boom".into()).into(), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
