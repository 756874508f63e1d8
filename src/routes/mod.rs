pub mod audit;
pub mod auth;
pub mod entries;
pub mod messages;
pub mod picks;
pub mod pools;
pub mod schedule;
pub mod teams;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::config::Config;
use crate::services::auth_user::{SharedTokenKeys, TokenKeys};

async fn read_root() -> Json<Value> {
    Json(json!({ "message": "Welcome to the RunMyPool backend!" }))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin
                .parse()
                .map_err(|_| warn!("Ignoring invalid CORS origin {}", origin))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn app(pool: SqlitePool, config: Arc<Config>) -> Router {
    let keys: SharedTokenKeys = Arc::new(TokenKeys::new(
        &config.secret_key,
        config.access_token_ttl_minutes,
    ));

    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/users", get(users::list_users))
        .route("/users/me", delete(users::remove_user))
        .route("/users/me/email", patch(users::update_email))
        .route("/users/me/password", patch(users::update_password))
        .route("/users/{user_id}", get(users::get_user))
        .route("/pools", get(pools::list_pools))
        .route("/pools/create", post(pools::create_pool))
        .route("/pools/my-pools", get(pools::get_my_pools))
        .route(
            "/pools/{pool_id}",
            get(pools::get_pool).patch(pools::update_pool).delete(pools::delete_pool),
        )
        .route("/pools/{pool_id}/is-admin", get(pools::check_pool_admin))
        .route("/entries", get(entries::list_entries))
        .route("/entries/create", post(entries::create_entry))
        .route("/entries/pool/{pool_id}", get(entries::get_user_entries_for_pool))
        .route("/entries/pool/{pool_id}/stats", get(entries::get_pool_entry_stats))
        .route(
            "/entries/{entry_id}",
            get(entries::get_entry).put(entries::update_entry).delete(entries::delete_entry),
        )
        .route("/picks/create", post(picks::create_pick))
        .route("/picks/entry/{entry_id}", get(picks::get_picks_for_entry))
        .route("/picks/{pick_id}", put(picks::update_pick).delete(picks::delete_pick))
        .route("/audit", get(audit::list_audit_logs))
        .route("/messages", get(messages::list_messages).post(messages::post_message))
        .route("/teams", get(teams::get_teams))
        .route("/teams/{team_id}", get(teams::get_team))
        .route("/teams/by-abbreviation/{abbreviation}", get(teams::get_team_by_abbreviation))
        .route("/schedule", get(schedule::get_all_schedules))
        .route("/schedule/week/{week_num}", get(schedule::get_schedule_for_week))
        .route("/schedule/teams/{week_num}", get(schedule::get_teams_playing_in_week))
        .layer(cors(&config.cors_origins))
        .layer(Extension(keys))
        .layer(Extension(config))
        .layer(Extension(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{lock_pick, memory_pool};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            port: 0,
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            secret_key: "test-secret".to_string(),
            access_token_ttl_minutes: 60,
            cors_origins: vec!["http://localhost:3000".to_string()],
            frontend_url: "http://localhost:3000".to_string(),
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register_and_login(app: &Router, email: &str) -> String {
        let creds = json!({ "email": email, "password": "correct horse" });
        let (status, _) = call(app, "POST", "/auth/register", None, Some(creds.clone())).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(app, "POST", "/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    async fn pool_with_entry(app: &Router, token: &str) -> (String, String) {
        let (status, created) = call(
            app,
            "POST",
            "/pools/create",
            Some(token),
            Some(json!({ "name": "Office Survivor", "lock_time": "2025-09-07T13:00" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let pool_id = created["id"].as_str().unwrap().to_string();

        let (status, entry) = call(
            app,
            "POST",
            "/entries/create",
            Some(token),
            Some(json!({ "pool_id": pool_id, "name": "Entry 1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (pool_id, entry["id"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app(memory_pool().await, test_config());
        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn registration_login_and_me() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "Fan@Example.com").await;

        let (status, me) = call(&app, "GET", "/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "fan@example.com");
        assert!(me.get("hashed_password").is_none());

        let dup = json!({ "email": "fan@example.com", "password": "x" });
        let (status, _) = call(&app, "POST", "/auth/register", None, Some(dup)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let wrong = json!({ "email": "fan@example.com", "password": "nope" });
        let (status, body) = call(&app, "POST", "/auth/login", None, Some(wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["detail"], "Invalid credentials");
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        let app = app(memory_pool().await, test_config());
        let (status, _) = call(&app, "GET", "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/picks/entry/anything", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn reset_token_is_not_an_access_token() {
        let pool = memory_pool().await;
        let config = test_config();
        let app = app(pool, config.clone());
        register_and_login(&app, "fan@example.com").await;

        let keys = TokenKeys::new(&config.secret_key, 60);
        let reset = keys.issue_password_reset("fan@example.com").unwrap();
        let (status, _) = call(&app, "GET", "/auth/me", Some(&reset), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let body = json!({ "token": reset, "new_password": "new secret" });
        let (status, _) = call(&app, "POST", "/auth/reset-password", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK);

        let creds = json!({ "email": "fan@example.com", "password": "new secret" });
        let (status, _) = call(&app, "POST", "/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);

        let access = keys.issue_access("whoever").unwrap();
        let body = json!({ "token": access, "new_password": "hijack" });
        let (status, _) = call(&app, "POST", "/auth/reset-password", None, Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn forgot_password_reply_does_not_reveal_accounts() {
        let app = app(memory_pool().await, test_config());
        register_and_login(&app, "fan@example.com").await;

        let (_, known) = call(
            &app,
            "POST",
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "fan@example.com" })),
        )
        .await;
        let (_, unknown) = call(
            &app,
            "POST",
            "/auth/forgot-password",
            None,
            Some(json!({ "email": "ghost@example.com" })),
        )
        .await;
        assert_eq!(known, unknown);
    }

    #[tokio::test]
    async fn pick_lifecycle_over_http() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "fan@example.com").await;
        let (_, entry_id) = pool_with_entry(&app, &token).await;

        let (status, pick) = call(
            &app,
            "POST",
            "/picks/create",
            Some(&token),
            Some(json!({ "entry_id": entry_id, "week": 1, "team": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(pick["team"], "A");
        assert_eq!(pick["locked"], false);
        let pick_id = pick["id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "POST",
            "/picks/create",
            Some(&token),
            Some(json!({ "entry_id": entry_id, "week": 2, "team": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Team A has already been selected in this entry");

        let (status, updated) = call(
            &app,
            "PUT",
            &format!("/picks/{pick_id}"),
            Some(&token),
            Some(json!({ "result": "win" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["result"], "win");
        assert_eq!(updated["team"], "A");

        let (status, picks) =
            call(&app, "GET", &format!("/picks/entry/{entry_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(picks.as_array().unwrap().len(), 1);

        let (status, body) =
            call(&app, "DELETE", &format!("/picks/{pick_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Pick deleted successfully");

        let (_, audit) = call(&app, "GET", "/audit", Some(&token), None).await;
        let actions: Vec<&str> = audit
            .as_array()
            .unwrap()
            .iter()
            .map(|log| log["action"].as_str().unwrap())
            .collect();
        assert_eq!(actions, vec!["pick.delete", "pick.update", "pick.create"]);
    }

    #[tokio::test]
    async fn malformed_pick_payload_is_a_validation_error() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "fan@example.com").await;
        let (_, entry_id) = pool_with_entry(&app, &token).await;

        let (status, body) = call(
            &app,
            "POST",
            "/picks/create",
            Some(&token),
            Some(json!({ "entry_id": entry_id, "week": "one", "team": "A" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn entries_and_picks_are_private_to_their_owner() {
        let app = app(memory_pool().await, test_config());
        let owner = register_and_login(&app, "owner@example.com").await;
        let stranger = register_and_login(&app, "stranger@example.com").await;
        let (pool_id, entry_id) = pool_with_entry(&app, &owner).await;

        let (status, missing) =
            call(&app, "GET", "/picks/entry/does-not-exist", Some(&stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, not_theirs) =
            call(&app, "GET", &format!("/picks/entry/{entry_id}"), Some(&stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(missing, not_theirs);

        let (status, _) = call(&app, "GET", &format!("/entries/{entry_id}"), Some(&stranger), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            "PATCH",
            &format!("/pools/{pool_id}"),
            Some(&stranger),
            Some(json!({ "name": "Mine now" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (_, admin) =
            call(&app, "GET", &format!("/pools/{pool_id}/is-admin"), Some(&owner), None).await;
        assert_eq!(admin["has_admin_access"], true);
        let (_, admin) =
            call(&app, "GET", &format!("/pools/{pool_id}/is-admin"), Some(&stranger), None).await;
        assert_eq!(admin["has_admin_access"], false);
    }

    #[tokio::test]
    async fn entry_names_are_unique_per_user_and_pool() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "fan@example.com").await;
        let (pool_id, _) = pool_with_entry(&app, &token).await;

        let (status, body) = call(
            &app,
            "POST",
            "/entries/create",
            Some(&token),
            Some(json!({ "pool_id": pool_id, "name": "Entry 1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["detail"], "You already have an entry with this name in this pool");

        let (_, stats) =
            call(&app, "GET", &format!("/entries/pool/{pool_id}/stats"), Some(&token), None).await;
        assert_eq!(stats, json!({ "totalEntries": 1, "survivors": 1, "eliminated": 0 }));
    }

    #[tokio::test]
    async fn pool_lock_time_must_parse() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "fan@example.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/pools/create",
            Some(&token),
            Some(json!({ "name": "Bad clock", "lock_time": "whenever" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn schedule_embeds_teams_and_lists_week_teams_by_abbreviation() {
        let pool = memory_pool().await;
        sqlx::query(
            "INSERT INTO teams (id, name, abbrv, logo) VALUES \
             (1, 'Kansas City Chiefs', 'KC', NULL), \
             (2, 'Buffalo Bills', 'BUF', NULL), \
             (3, 'Arizona Cardinals', 'ARI', NULL), \
             (4, 'Detroit Lions', 'DET', NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO schedule (game_id, week_num, home_team_id, away_team_id, start_time) VALUES \
             (10, 1, 1, 2, '2025-09-07T17:00:00+00:00'), \
             (11, 1, 4, 3, '2025-09-07T20:25:00+00:00'), \
             (12, 2, 2, 3, '2025-09-14T17:00:00+00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let app = app(pool, test_config());

        let (status, games) = call(&app, "GET", "/schedule/week/1", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let games = games.as_array().unwrap().clone();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0]["home_team"]["abbrv"], "KC");
        assert_eq!(games[0]["away_team"]["name"], "Buffalo Bills");

        let (_, teams) = call(&app, "GET", "/schedule/teams/1", None, None).await;
        let abbrvs: Vec<&str> = teams
            .as_array()
            .unwrap()
            .iter()
            .map(|team| team["abbrv"].as_str().unwrap())
            .collect();
        assert_eq!(abbrvs, vec!["ARI", "BUF", "DET", "KC"]);

        let (_, all) = call(&app, "GET", "/schedule", None, None).await;
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (status, _) = call(&app, "GET", "/teams/by-abbreviation/XYZ", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, team) = call(&app, "GET", "/teams/2", None, None).await;
        assert_eq!(team["abbrv"], "BUF");
    }

    #[tokio::test]
    async fn message_board_assigns_author() {
        let app = app(memory_pool().await, test_config());
        let token = register_and_login(&app, "fan@example.com").await;
        let (_, me) = call(&app, "GET", "/auth/me", Some(&token), None).await;

        let (status, posted) = call(
            &app,
            "POST",
            "/messages",
            Some(&token),
            Some(json!({ "message": "Good luck everyone" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(posted["user_id"], me["id"]);

        let (status, _) = call(&app, "POST", "/messages", Some(&token), Some(json!({ "message": " " }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, listed) = call(&app, "GET", "/messages", None, None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn locked_picks_survive_entry_pool_and_account_deletion() {
        let store = memory_pool().await;
        let app = app(store.clone(), test_config());
        let token = register_and_login(&app, "fan@example.com").await;
        let (pool_id, entry_id) = pool_with_entry(&app, &token).await;

        let (_, locked) = call(
            &app,
            "POST",
            "/picks/create",
            Some(&token),
            Some(json!({ "entry_id": entry_id, "week": 1, "team": "A" })),
        )
        .await;
        lock_pick(&store, locked["id"].as_str().unwrap()).await;

        let (_, spare) = call(
            &app,
            "POST",
            "/entries/create",
            Some(&token),
            Some(json!({ "pool_id": pool_id, "name": "Entry 2" })),
        )
        .await;
        let spare_id = spare["id"].as_str().unwrap().to_string();
        let (status, _) = call(
            &app,
            "POST",
            "/picks/create",
            Some(&token),
            Some(json!({ "entry_id": spare_id, "week": 1, "team": "B" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        for uri in [format!("/entries/{entry_id}"), format!("/pools/{pool_id}"), "/users/me".to_string()] {
            let (status, body) = call(&app, "DELETE", &uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["detail"], "Cannot delete a locked pick");
        }

        let (status, _) = call(&app, "DELETE", &format!("/entries/{spare_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let remaining: Vec<String> = sqlx::query_scalar("SELECT entry_id FROM picks")
            .fetch_all(&store)
            .await
            .unwrap();
        assert_eq!(remaining, vec![entry_id]);
    }
}
