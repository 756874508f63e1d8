use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;

use crate::dto::audit_dto::AuditLog;
use crate::dto::page_dto::Page;
use crate::error::AppError;
use crate::services::auth_user::AuthUser;

/**
 * GET the caller's own audit trail, newest first.
 */
pub async fn list_audit_logs(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let logs = sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT id, user_id, action, details, created_at
        FROM audit_logs
        WHERE user_id = ?
        ORDER BY rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(&user.id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    Ok((StatusCode::OK, Json(logs)))
}
