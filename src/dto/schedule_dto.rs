use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::dto::team_dto::Team;

/* Flat join of a schedule row with both teams */
#[derive(Debug, FromRow)]
pub struct GameRow {
    pub game_id: i64,
    pub week_num: i64,
    pub start_time: DateTime<Utc>,
    pub winning_team_id: String,
    pub home_id: i64,
    pub home_name: String,
    pub home_abbrv: String,
    pub home_logo: Option<String>,
    pub away_id: i64,
    pub away_name: String,
    pub away_abbrv: String,
    pub away_logo: Option<String>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Game {
    pub game_id: i64,
    pub week_num: i64,
    pub home_team: Team,
    pub away_team: Team,
    pub start_time: DateTime<Utc>,
    pub winning_team_id: String
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        Self {
            game_id: row.game_id,
            week_num: row.week_num,
            home_team: Team {
                id: row.home_id,
                name: row.home_name,
                abbrv: row.home_abbrv,
                logo: row.home_logo,
            },
            away_team: Team {
                id: row.away_id,
                name: row.away_name,
                abbrv: row.away_abbrv,
                logo: row.away_logo,
            },
            start_time: row.start_time,
            winning_team_id: row.winning_team_id,
        }
    }
}
