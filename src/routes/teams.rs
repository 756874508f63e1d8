use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::dto::team_dto::Team;
use crate::error::AppError;

/**
 * GET request to get all the teams.
 */
pub async fn get_teams(Extension(pool): Extension<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    info!("Fetching teams.");

    let teams = sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY id")
        .fetch_all(&pool)
        .await?;

    Ok((StatusCode::OK, Json(teams)))
}

/**
 * GET request to get one team by id.
 */
pub async fn get_team(
    Extension(pool): Extension<SqlitePool>,
    Path(team_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = ?")
        .bind(team_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Team"))?;

    Ok((StatusCode::OK, Json(team)))
}

/**
 * GET request to get one team by its abbreviation.
 */
pub async fn get_team_by_abbreviation(
    Extension(pool): Extension<SqlitePool>,
    Path(abbreviation): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE abbrv = ?")
        .bind(&abbreviation)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Team"))?;

    Ok((StatusCode::OK, Json(team)))
}
