use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub pool_id: String,
    pub alive: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Debug, Deserialize)]
pub struct CreateEntry {
    pub pool_id: String,
    pub name: String
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateEntry {
    pub name: Option<String>
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolEntryStats {
    pub total_entries: i64,
    pub survivors: i64,
    pub eliminated: i64
}
