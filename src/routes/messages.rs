use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::dto::message_dto::{Message, PostMessage};
use crate::dto::page_dto::Page;
use crate::error::AppError;
use crate::services::auth_user::AuthUser;

pub async fn list_messages(
    Extension(pool): Extension<SqlitePool>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let messages = sqlx::query_as::<_, Message>(
        "SELECT * FROM message_board ORDER BY rowid DESC LIMIT ? OFFSET ?",
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    Ok((StatusCode::OK, Json(messages)))
}

pub async fn post_message(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    payload: Result<Json<PostMessage>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let text = payload.message.trim();
    if text.is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }
    info!("Posting message for {}", user.id);

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO message_board (id, user_id, message, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user.id)
    .bind(text)
    .bind(Utc::now())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::OK, Json(message)))
}
