use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing and not-owned are reported identically.
    #[error("{0} not found or doesn't belong to you")]
    NotFoundOrForbidden(&'static str),

    /// Only for publicly listable resources (pools, teams, users). Entry and pick
    /// lookups use `NotFoundOrForbidden` so ownership is never revealed.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("Team {team} has already been selected in this entry")]
    DuplicateTeamSelection { team: String },

    #[error("Week {week} already has a pick in this entry")]
    WeekAlreadyPicked { week: i64 },

    #[error("Cannot {action} a locked pick")]
    PickLocked { action: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFoundOrForbidden(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DuplicateTeamSelection { .. }
            | AppError::WeekAlreadyPicked { .. }
            | AppError::PickLocked { .. } => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let detail = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                error!("Request failed: {}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// True when `err` is a UNIQUE constraint failure naming `column`
/// (SQLite reports e.g. `UNIQUE constraint failed: picks.entry_id, picks.team`).
pub fn is_unique_violation_on(err: &sqlx::Error, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.is_unique_violation()
                && db
                    .message()
                    .split(|c: char| c == ',' || c == ':')
                    .any(|part| part.trim() == column)
        }
        _ => false,
    }
}
