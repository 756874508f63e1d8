use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>
}

#[derive(Debug, Deserialize)]
pub struct PostMessage {
    pub message: String
}
