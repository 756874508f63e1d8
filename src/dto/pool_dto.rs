use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Pool {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub lock_time: Option<DateTime<Utc>>,
    pub is_private: bool,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>
}

#[derive(Debug, Deserialize)]
pub struct CreatePool {
    pub name: String,
    pub description: Option<String>,
    pub lock_time: Option<String>,
    #[serde(default)]
    pub is_private: bool
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdatePool {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lock_time: Option<String>,
    pub is_private: Option<bool>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PoolAdminStatus {
    pub pool_id: String,
    pub is_owner: bool,
    pub is_admin: bool,
    pub has_admin_access: bool
}
