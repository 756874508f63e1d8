use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

/// Appends an audit record on the caller's connection, so it commits or
/// rolls back together with the change it describes.
pub async fn record(
    conn: &mut SqliteConnection,
    user_id: &str,
    action: &str,
    details: String,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, details, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(action)
    .bind(details)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}
