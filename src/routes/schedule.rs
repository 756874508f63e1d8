use std::collections::BTreeMap;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::SqlitePool;

use crate::dto::schedule_dto::{Game, GameRow};
use crate::dto::team_dto::Team;
use crate::error::AppError;

const GAME_SELECT: &str = r#"
    SELECT
        s.game_id,
        s.week_num,
        s.start_time,
        s.winning_team_id,
        h.id AS home_id,
        h.name AS home_name,
        h.abbrv AS home_abbrv,
        h.logo AS home_logo,
        a.id AS away_id,
        a.name AS away_name,
        a.abbrv AS away_abbrv,
        a.logo AS away_logo
    FROM schedule s
    JOIN teams h ON h.id = s.home_team_id
    JOIN teams a ON a.id = s.away_team_id
"#;

async fn games_for_week(pool: &SqlitePool, week_num: i64) -> Result<Vec<Game>, sqlx::Error> {
    let query = format!("{GAME_SELECT} WHERE s.week_num = ? ORDER BY s.start_time, s.game_id");
    let rows = sqlx::query_as::<_, GameRow>(&query)
        .bind(week_num)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(Game::from).collect())
}

/// Distinct teams across `games`, sorted by abbreviation.
fn teams_playing(games: Vec<Game>) -> Vec<Team> {
    let mut by_abbrv = BTreeMap::new();
    for game in games {
        by_abbrv.insert(game.home_team.abbrv.clone(), game.home_team);
        by_abbrv.insert(game.away_team.abbrv.clone(), game.away_team);
    }
    by_abbrv.into_values().collect()
}

/**
 * GET every game of one week.
 */
pub async fn get_schedule_for_week(
    Extension(pool): Extension<SqlitePool>,
    Path(week_num): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let games = games_for_week(&pool, week_num).await?;
    Ok((StatusCode::OK, Json(games)))
}

/**
 * GET the teams available to pick in a week.
 */
pub async fn get_teams_playing_in_week(
    Extension(pool): Extension<SqlitePool>,
    Path(week_num): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let games = games_for_week(&pool, week_num).await?;
    Ok((StatusCode::OK, Json(teams_playing(games))))
}

pub async fn get_all_schedules(Extension(pool): Extension<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let query = format!("{GAME_SELECT} ORDER BY s.week_num, s.start_time");
    let games: Vec<Game> = sqlx::query_as::<_, GameRow>(&query)
        .fetch_all(&pool)
        .await?
        .into_iter()
        .map(Game::from)
        .collect();

    Ok((StatusCode::OK, Json(games)))
}
