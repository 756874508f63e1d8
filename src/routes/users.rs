use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::db;
use crate::dto::page_dto::Page;
use crate::dto::user_dto::{UpdateEmail, UpdatePassword, User, UserOut};
use crate::error::{is_unique_violation_on, AppError};
use crate::routes::auth::{validate_email, validate_password};
use crate::services::auth_user::AuthUser;
use crate::services::password::hash_password;
use crate::services::pick_ledger::{self, EntryScope};

pub async fn list_users(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(_caller): AuthUser,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY rowid LIMIT ? OFFSET ?")
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&pool)
        .await?;

    let users: Vec<UserOut> = users.into_iter().map(UserOut::from).collect();
    Ok((StatusCode::OK, Json(users)))
}

pub async fn get_user(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(_caller): AuthUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok((StatusCode::OK, Json(UserOut::from(user))))
}

pub async fn remove_user(
    AuthUser(user): AuthUser,
    Extension(pool): Extension<SqlitePool>,
) -> Result<impl IntoResponse, AppError> {
    info!("Removing user {}", user.id);

    let mut tx = db::begin_write(&pool).await?;
    pick_ledger::ensure_no_locked_picks(&mut tx, EntryScope::User(&user.id)).await?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(json!({ "message": format!("Successfully removed {}", user.email) }))))
}

pub async fn update_email(
    AuthUser(user): AuthUser,
    Extension(pool): Extension<SqlitePool>,
    payload: Result<Json<UpdateEmail>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let email = validate_email(&payload.email)?;

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users SET email = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&email)
    .bind(Utc::now())
    .bind(&user.id)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "users.email") {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    Ok((StatusCode::OK, Json(UserOut::from(updated))))
}

pub async fn update_password(
    AuthUser(user): AuthUser,
    Extension(pool): Extension<SqlitePool>,
    payload: Result<Json<UpdatePassword>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    validate_password(&payload.password)?;

    sqlx::query("UPDATE users SET hashed_password = ?, updated_at = ? WHERE id = ?")
        .bind(hash_password(&payload.password)?)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(&pool)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "message": "Password updated" }))))
}
