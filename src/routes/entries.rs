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
use crate::dto::entry_dto::{CreateEntry, Entry, PoolEntryStats, UpdateEntry};
use crate::dto::page_dto::Page;
use crate::error::{is_unique_violation_on, AppError};
use crate::services::auth_user::AuthUser;
use crate::services::pick_ledger::{self, EntryScope};

const DUPLICATE_NAME: &str = "You already have an entry with this name in this pool";

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Entry name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn translate_name_conflict(err: sqlx::Error) -> AppError {
    if is_unique_violation_on(&err, "entries.name") {
        AppError::Conflict(DUPLICATE_NAME.to_string())
    } else {
        AppError::Database(err)
    }
}

async fn find_owned_entry(pool: &SqlitePool, entry_id: &str, user_id: &str) -> Result<Entry, AppError> {
    sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE id = ? AND user_id = ?")
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFoundOrForbidden("Entry"))
}

/**
 * POST a new entry for the caller in an existing pool.
 */
pub async fn create_entry(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateEntry>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let name = validate_name(&payload.name)?;
    info!("Creating entry {} in pool {}", name, payload.pool_id);

    let pool_exists: Option<String> = sqlx::query_scalar("SELECT id FROM pools WHERE id = ?")
        .bind(&payload.pool_id)
        .fetch_optional(&pool)
        .await?;
    if pool_exists.is_none() {
        return Err(AppError::NotFound("Pool"));
    }

    let now = Utc::now();
    let entry = sqlx::query_as::<_, Entry>(
        r#"
        INSERT INTO entries (id, name, user_id, pool_id, alive, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&name)
    .bind(&user.id)
    .bind(&payload.pool_id)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(translate_name_conflict)?;

    Ok((StatusCode::OK, Json(entry)))
}

/**
 * GET the caller's entries in one pool.
 */
pub async fn get_user_entries_for_pool(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pool_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, Entry>(
        "SELECT * FROM entries WHERE user_id = ? AND pool_id = ? ORDER BY rowid",
    )
    .bind(&user.id)
    .bind(&pool_id)
    .fetch_all(&pool)
    .await?;

    Ok((StatusCode::OK, Json(entries)))
}

/**
 * GET survivor counts across every entry of a pool.
 */
pub async fn get_pool_entry_stats(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(_user): AuthUser,
    Path(pool_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (total_entries, survivors): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(alive), 0) FROM entries WHERE pool_id = ?",
    )
    .bind(&pool_id)
    .fetch_one(&pool)
    .await?;

    Ok((
        StatusCode::OK,
        Json(PoolEntryStats {
            total_entries,
            survivors,
            eliminated: total_entries - survivors,
        }),
    ))
}

pub async fn list_entries(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Query(page): Query<Page>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, Entry>(
        "SELECT * FROM entries WHERE user_id = ? ORDER BY rowid LIMIT ? OFFSET ?",
    )
    .bind(&user.id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(&pool)
    .await?;

    Ok((StatusCode::OK, Json(entries)))
}

pub async fn get_entry(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entry = find_owned_entry(&pool, &entry_id, &user.id).await?;
    Ok((StatusCode::OK, Json(entry)))
}

pub async fn update_entry(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(entry_id): Path<String>,
    payload: Result<Json<UpdateEntry>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(changes) = payload?;
    let mut entry = find_owned_entry(&pool, &entry_id, &user.id).await?;

    if let Some(name) = changes.name {
        entry.name = validate_name(&name)?;
    }
    entry.updated_at = Utc::now();

    sqlx::query("UPDATE entries SET name = ?, updated_at = ? WHERE id = ?")
        .bind(&entry.name)
        .bind(entry.updated_at)
        .bind(&entry.id)
        .execute(&pool)
        .await
        .map_err(translate_name_conflict)?;

    Ok((StatusCode::OK, Json(entry)))
}

pub async fn delete_entry(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    info!("Deleting entry {}", entry_id);

    let mut tx = db::begin_write(&pool).await?;
    let owned: Option<String> = sqlx::query_scalar("SELECT id FROM entries WHERE id = ? AND user_id = ?")
        .bind(&entry_id)
        .bind(&user.id)
        .fetch_optional(&mut *tx)
        .await?;
    if owned.is_none() {
        return Err(AppError::NotFoundOrForbidden("Entry"));
    }

    pick_ledger::ensure_no_locked_picks(&mut tx, EntryScope::Entry(&entry_id)).await?;

    sqlx::query("DELETE FROM entries WHERE id = ?")
        .bind(&entry_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok((StatusCode::OK, Json(json!({ "message": "Entry deleted successfully" }))))
}
