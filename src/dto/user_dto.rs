use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String
}

#[derive(Debug, Deserialize)]
pub struct UpdateEmail {
    pub email: String
}

#[derive(Debug, Deserialize)]
pub struct UpdatePassword {
    pub password: String
}

#[derive(Debug, Deserialize)]
pub struct ForgotPassword {
    pub email: String
}

#[derive(Debug, Deserialize)]
pub struct ResetPassword {
    pub token: String,
    pub new_password: String
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str
}

/* Row as stored; never serialized directly since it carries the hash */
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub role: String,
    pub created_at: DateTime<Utc>
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserOut {
    pub id: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}
