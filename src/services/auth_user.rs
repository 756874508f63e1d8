use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::SqlitePool;
use tracing::{error, warn};

use crate::dto::claims_dto::{Claims, PASSWORD_RESET};
use crate::dto::user_dto::User;
use crate::error::AppError;

/// HS256 keys built once from configuration and shared through an `Extension`.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

pub type SharedTokenKeys = Arc<TokenKeys>;

impl TokenKeys {
    pub fn new(secret: &str, access_ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
        }
    }

    pub fn issue_access(&self, user_id: &str) -> Result<String, AppError> {
        self.issue(user_id, None, self.access_ttl)
    }

    pub fn issue_password_reset(&self, email: &str) -> Result<String, AppError> {
        self.issue(email, Some(PASSWORD_RESET.to_string()), Duration::hours(1))
    }

    fn issue(&self, sub: &str, token_type: Option<String>, ttl: Duration) -> Result<String, AppError> {
        let claims = Claims {
            sub: sub.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            AppError::Internal(format!("Token encoding failed: {e}"))
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::default()).map(|data| data.claims)
    }
}

/// The caller behind a valid bearer access token.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let auth = headers.get("Authorization").and_then(|h| h.to_str().ok());
        let token = auth
            .and_then(|s| s.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized("Missing or invalid Authorization header"))?;

        let keys = parts
            .extensions
            .get::<SharedTokenKeys>()
            .cloned()
            .ok_or_else(|| AppError::Internal("token keys extension missing".into()))?;
        let pool = parts
            .extensions
            .get::<SqlitePool>()
            .cloned()
            .ok_or_else(|| AppError::Internal("database extension missing".into()))?;

        let claims = keys.verify(token).map_err(|e| {
            error!("Token decoding failed: {:?}", e);
            AppError::Unauthorized("Invalid authentication credentials")
        })?;

        if claims.token_type.is_some() {
            warn!("Rejected non-access token used as bearer credential");
            return Err(AppError::Unauthorized("Invalid authentication credentials"));
        }

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(&claims.sub)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::Unauthorized("User not found"))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("User is inactive"));
        }

        Ok(AuthUser(user))
    }
}
