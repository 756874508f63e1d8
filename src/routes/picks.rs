use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::dto::pick_dto::{CreatePick, UpdatePick};
use crate::error::AppError;
use crate::services::{auth_user::AuthUser, pick_ledger};

/**
 * POST a pick for an entry's week; resubmitting a week replaces its team.
 */
pub async fn create_pick(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreatePick>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    info!("Submitting week {} pick {} for entry {}", payload.week, payload.team, payload.entry_id);

    let pick = pick_ledger::submit(&pool, &user.id, payload).await?;
    Ok((StatusCode::OK, Json(pick)))
}

/**
 * GET every pick of an entry, ordered by week.
 */
pub async fn get_picks_for_entry(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(entry_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let picks = pick_ledger::list(&pool, &user.id, &entry_id).await?;
    Ok((StatusCode::OK, Json(picks)))
}

/**
 * PUT a partial update onto an unlocked pick.
 */
pub async fn update_pick(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pick_id): Path<String>,
    payload: Result<Json<UpdatePick>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(changes) = payload?;
    info!("Updating pick {}", pick_id);

    let pick = pick_ledger::update(&pool, &user.id, &pick_id, changes).await?;
    Ok((StatusCode::OK, Json(pick)))
}

/**
 * DELETE an unlocked pick.
 */
pub async fn delete_pick(
    Extension(pool): Extension<SqlitePool>,
    AuthUser(user): AuthUser,
    Path(pick_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    info!("Deleting pick {}", pick_id);

    pick_ledger::delete(&pool, &user.id, &pick_id).await?;
    Ok((StatusCode::OK, Json(json!({ "message": "Pick deleted successfully" }))))
}
