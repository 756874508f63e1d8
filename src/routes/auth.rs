use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::dto::claims_dto::PASSWORD_RESET;
use crate::dto::user_dto::{AccessToken, Credentials, ForgotPassword, ResetPassword, User, UserOut};
use crate::error::{is_unique_violation_on, AppError};
use crate::services::auth_user::{AuthUser, SharedTokenKeys};
use crate::services::password::{hash_password, verify_password};

const FORGOT_PASSWORD_REPLY: &str =
    "If an account with that email exists, you will receive a password reset link shortly.";

pub(crate) fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::Validation(format!("Invalid email address: {email}"))),
    }
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("Password must not be empty".to_string()));
    }
    Ok(())
}

/* POST to register a new user */
pub async fn register(
    Extension(pool): Extension<SqlitePool>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let email = validate_email(&payload.email)?;
    validate_password(&payload.password)?;
    info!("Registration attempt for {}", email);

    /* First check if the user with that email already exists */
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let now = Utc::now();
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, hashed_password, is_active, role, created_at, updated_at)
        VALUES (?, ?, ?, 1, 'USER', ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&email)
    .bind(hash_password(&payload.password)?)
    .bind(now)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "users.email") {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    info!("Created user {}", user.id);
    Ok((StatusCode::OK, Json(UserOut::from(user))))
}

/* POST to login the user */
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(keys): Extension<SharedTokenKeys>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    /* Unknown email and wrong password look the same from outside */
    let user = match user {
        Some(user) if user.is_active && verify_password(&payload.password, &user.hashed_password) => user,
        _ => {
            warn!("Failed login for {}", email);
            return Err(AppError::Unauthorized("Invalid credentials"));
        }
    };

    let token = keys.issue_access(&user.id)?;
    Ok((
        StatusCode::OK,
        Json(AccessToken { access_token: token, token_type: "bearer" }),
    ))
}

pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    (StatusCode::OK, Json(UserOut::from(user)))
}

/* POST to start a password reset; same reply whether or not the account exists */
pub async fn forgot_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(keys): Extension<SharedTokenKeys>,
    Extension(config): Extension<Arc<Config>>,
    payload: Result<Json<ForgotPassword>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    if let Some(user) = user {
        let reset_token = keys.issue_password_reset(&user.email)?;
        // No mailer yet; the link goes to the log.
        info!(
            "Password reset for {}: {}/reset-password?token={}",
            user.email, config.frontend_url, reset_token
        );
    }

    Ok((StatusCode::OK, Json(json!({ "message": FORGOT_PASSWORD_REPLY }))))
}

/* POST to set a new password with a reset token */
pub async fn reset_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(keys): Extension<SharedTokenKeys>,
    payload: Result<Json<ResetPassword>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    validate_password(&payload.new_password)?;

    let claims = keys.verify(&payload.token).map_err(|e| {
        warn!("Reset token rejected: {:?}", e);
        AppError::Validation("Invalid or expired reset token".to_string())
    })?;

    if claims.token_type.as_deref() != Some(PASSWORD_RESET) {
        return Err(AppError::Validation("Invalid reset token".to_string()));
    }

    let res = sqlx::query("UPDATE users SET hashed_password = ?, updated_at = ? WHERE email = ?")
        .bind(hash_password(&payload.new_password)?)
        .bind(Utc::now())
        .bind(&claims.sub)
        .execute(&pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::Validation("User not found".to_string()));
    }

    Ok((StatusCode::OK, Json(json!({ "message": "Password reset successfully" }))))
}
