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
use uuid::Uuid;

use crate::db;
use crate::dto::page_dto::Page;
use crate::dto::pool_dto::{CreatePool, Pool, PoolAdminStatus, UpdatePool};
use crate::error::AppError;
use crate::services::pick_ledger::{self, EntryScope};
use crate::services::{auth_user::AuthUser, lock_time::parse_lock_time};

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Pool name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

async fn find_pool(pool: &SqlitePool, pool_id: &str) -> Result<Pool, AppError> {
    sqlx::query_as::<_, Pool>("SELECT * FROM pools WHERE id = ?")
        .bind(pool_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Pool"))
}

/**
 * POST to create a pool owned (and administered) by the caller.
 */
pub async fn create_pool(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreatePool>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let name = validate_name(&payload.name)?;
    let lock_time = payload.lock_time.as_deref().map(parse_lock_time).transpose()?;
    info!("Creating pool {}", name);

    let now = Utc::now();
    let mut tx = db::begin_write(&pool).await?;

    let created = sqlx::query_as::<_, Pool>(
        r#"
        INSERT INTO pools (id, name, description, lock_time, is_private, owner_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&name)
    .bind(&payload.description)
    .bind(lock_time)
    .bind(payload.is_private)
    .bind(&user.id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO pool_admins (pool_id, user_id) VALUES (?, ?)")
        .bind(&created.id)
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((StatusCode::OK, Json(created)))
}

/**
 * GET the pools the caller owns.
 */
pub async fn get_my_pools(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let pools = sqlx::query_as::<_, Pool>("SELECT * FROM pools WHERE owner_id = ? ORDER BY rowid")
        .bind(&user.id)
        .fetch_all(&pool)
        .await?;

    Ok((StatusCode::OK, Json(pools)))
}

pub async fn list_pools(
    Extension(pool): Extension<SqlitePool>,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let pools = sqlx::query_as::<_, Pool>("SELECT * FROM pools ORDER BY rowid LIMIT ? OFFSET ?")
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&pool)
        .await?;

    Ok((StatusCode::OK, Json(pools)))
}

pub async fn get_pool(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(_user): AuthUser,
    Path(pool_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let found = find_pool(&pool, &pool_id).await?;
    Ok((StatusCode::OK, Json(found)))
}

/**
 * PATCH a pool; only the owner may, and only supplied fields change.
 */
pub async fn update_pool(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pool_id): Path<String>,
    payload: Result<Json<UpdatePool>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(changes) = payload?;
    let mut target = find_pool(&pool, &pool_id).await?;

    if target.owner_id != user.id {
        return Err(AppError::Forbidden("Only pool owner can update the pool"));
    }

    if let Some(name) = changes.name {
        target.name = validate_name(&name)?;
    }
    if let Some(description) = changes.description {
        target.description = Some(description);
    }
    if let Some(lock_time) = changes.lock_time {
        target.lock_time = Some(parse_lock_time(&lock_time)?);
    }
    if let Some(is_private) = changes.is_private {
        target.is_private = is_private;
    }
    target.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE pools
        SET name = ?, description = ?, lock_time = ?, is_private = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&target.name)
    .bind(&target.description)
    .bind(target.lock_time)
    .bind(target.is_private)
    .bind(target.updated_at)
    .bind(&target.id)
    .execute(&pool)
    .await?;

    Ok((StatusCode::OK, Json(target)))
}

pub async fn delete_pool(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pool_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    info!("Deleting pool {}", pool_id);
    let target = find_pool(&pool, &pool_id).await?;

    if target.owner_id != user.id {
        return Err(AppError::Forbidden("Only pool owner can delete the pool"));
    }

    let mut tx = db::begin_write(&pool).await?;
    pick_ledger::ensure_no_locked_picks(&mut tx, EntryScope::Pool(&target.id)).await?;

    sqlx::query("DELETE FROM pools WHERE id = ?")
        .bind(&target.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(json!({ "message": "Pool deleted successfully" }))))
}

pub async fn check_pool_admin(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pool_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let target = find_pool(&pool, &pool_id).await?;
    let is_owner = target.owner_id == user.id;

    let admin: Option<String> =
        sqlx::query_scalar("SELECT user_id FROM pool_admins WHERE pool_id = ? AND user_id = ?")
            .bind(&target.id)
            .bind(&user.id)
            .fetch_optional(&pool)
            .await?;
    let is_admin = admin.is_some();

    Ok((
        StatusCode::OK,
        Json(PoolAdminStatus {
            pool_id: target.id,
            is_owner,
            is_admin,
            has_admin_access: is_owner || is_admin,
        }),
    ))
}
